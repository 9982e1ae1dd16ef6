use crate::{
    error::{Error, ErrorOrigin},
    model::{IgnoreFlags, ReservedColumn},
    traits::FieldValues,
    types::DbType,
    value::Value,
};

///
/// ColumnModel
///
/// One mapped column: physical name, type, key role, and per-operation
/// exclusions. Equality is by (name, type), which is what deduplication uses.
///

#[derive(Clone, Debug)]
pub struct ColumnModel {
    /// Logical field name; the accessor key.
    pub field: &'static str,
    /// Physical column name.
    pub name: String,
    pub db_type: DbType,
    pub size: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub nullable: bool,
    pub primary_key: bool,
    pub identity: bool,
    pub ignore: IgnoreFlags,
    pub reserved: Option<ReservedColumn>,
}

impl ColumnModel {
    /// Read this column's value from an entity.
    pub fn read<E: FieldValues>(&self, entity: &E) -> Result<Value, Error> {
        entity.get_value(self.field).ok_or_else(|| {
            Error::configuration(
                ErrorOrigin::Model,
                format!("entity has no accessor for field '{}'", self.field),
            )
        })
    }

    /// Write a value into this column's field on an entity.
    pub fn write<E: FieldValues>(&self, entity: &mut E, value: &Value) -> Result<(), Error> {
        entity.set_value(self.field, value)
    }

    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        self.reserved.is_some()
    }

    #[must_use]
    pub fn is(&self, reserved: ReservedColumn) -> bool {
        self.reserved == Some(reserved)
    }
}

impl PartialEq for ColumnModel {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.db_type == other.db_type
    }
}

impl Eq for ColumnModel {}
