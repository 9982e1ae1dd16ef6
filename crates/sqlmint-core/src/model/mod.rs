//! Runtime mapping model.
//!
//! - `declaration`: what the derive macro emits (*what exists*).
//! - `entity` / `column`: the resolved mapping plan (*what runs*).
//! - `cache`: process-wide, build-once plan cache keyed by type.

pub mod cache;
pub mod column;
pub mod declaration;
pub mod entity;


pub use cache::EntityCache;
pub use column::ColumnModel;
pub use declaration::{
    EntityDeclaration, EntityFlags, FieldDeclaration, IgnoreFlags, ReferenceDeclaration,
};
pub use entity::{EntityModel, Features, TableName, VirtualForeignKey};

use derive_more::Display;

///
/// ReservedColumn
///
/// The six bookkeeping columns the engine maintains itself. Recognized by
/// logical field name; their physical names come from configuration.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ReservedColumn {
    CreatedBy,
    CreatedOn,
    UpdatedBy,
    UpdatedOn,
    VersionNo,
    IsActive,
}

impl ReservedColumn {
    pub const ALL: [Self; 6] = [
        Self::CreatedBy,
        Self::CreatedOn,
        Self::UpdatedBy,
        Self::UpdatedOn,
        Self::VersionNo,
        Self::IsActive,
    ];

    /// Logical field name that maps onto this reserved column.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::CreatedBy => "created_by",
            Self::CreatedOn => "created_on",
            Self::UpdatedBy => "updated_by",
            Self::UpdatedOn => "updated_on",
            Self::VersionNo => "version_no",
            Self::IsActive => "is_active",
        }
    }

    #[must_use]
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.field_name() == name)
    }

    /// Whether the column holds a timestamp maintained by the engine.
    #[must_use]
    pub const fn is_timestamp(self) -> bool {
        matches!(self, Self::CreatedOn | Self::UpdatedOn)
    }
}
