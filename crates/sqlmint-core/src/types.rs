use derive_more::Display;
use serde::Deserialize;

///
/// DbType
///
/// Dialect-neutral column type. Each dialect maps it to a DDL type name.
/// Inferred from a field's Rust type unless declared explicitly.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq)]
#[remain::sorted]
pub enum DbType {
    Binary,
    Boolean,
    Date,
    DateTime,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    Single,
    String,
    Text,
}

impl DbType {
    /// Whether a column of this type may serve as a primary key.
    #[must_use]
    pub const fn is_keyable(self) -> bool {
        matches!(
            self,
            Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::String
                | Self::Guid
                | Self::Date
                | Self::DateTime
        )
    }

    /// Whether the database can generate values for this type on insert.
    #[must_use]
    pub const fn supports_identity(self) -> bool {
        matches!(self, Self::Int16 | Self::Int32 | Self::Int64)
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int16 | Self::Int32 | Self::Int64)
    }
}

///
/// Status
///
/// Implicit is-active filter applied to reads and counts on types that carry
/// the is-active column.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum Status {
    #[default]
    Active,
    InActive,
    All,
}

impl Status {
    /// The is-active value this status selects, `None` for no filter.
    #[must_use]
    pub const fn is_active_filter(self) -> Option<bool> {
        match self {
            Self::Active => Some(true),
            Self::InActive => Some(false),
            Self::All => None,
        }
    }
}

///
/// ObjectKind
/// Database object kinds understood by existence checks.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ObjectKind {
    Table,
    View,
    Function,
    Procedure,
    Index,
}
