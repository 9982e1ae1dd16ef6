mod field_value;


pub use field_value::FieldValue;

use crate::{
    error::{Error, ErrorOrigin},
    model::declaration::EntityDeclaration,
    value::Value,
};

// ============================================================================
// ENTITY CONTRACTS
// ============================================================================
//
// These traits are implemented by `#[derive(Entity)]`. They describe *what an
// entity is* (a static declaration) and how its fields are read and written.
// The runtime mapping plan is derived from them by the entity cache.
//

///
/// EntityKind
///
/// A record type mapped onto one table.
///
/// `DECLARATION` is pure data: names, flags, and per-field annotations.
/// Nothing here depends on the active dialect or configuration.
///

pub trait EntityKind: FieldValues + Default + Sized + 'static {
    const DECLARATION: &'static EntityDeclaration;
}

///
/// FieldValues
///
/// Accessor pair per field, keyed by logical field name.
///

pub trait FieldValues {
    /// Read one field. `None` when the entity has no such field.
    fn get_value(&self, field: &str) -> Option<Value>;

    /// Write one field from a row or generated value.
    fn set_value(&mut self, field: &str, value: &Value) -> Result<(), Error>;
}

/// Shared error for generated `set_value` implementations.
#[doc(hidden)]
#[must_use]
pub fn set_value_error(entity: &str, field: &str, value: &Value) -> Error {
    Error::conversion(
        ErrorOrigin::Model,
        format!("cannot assign {value:?} to {entity}.{field}"),
    )
}

/// Shared error for generated `set_value` implementations.
#[doc(hidden)]
#[must_use]
pub fn unknown_field_error(entity: &str, field: &str) -> Error {
    Error::configuration(ErrorOrigin::Model, format!("unknown field: {entity}.{field}"))
}
