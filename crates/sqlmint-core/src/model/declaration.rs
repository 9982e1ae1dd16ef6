use crate::types::DbType;

///
/// EntityDeclaration
///
/// Macro-generated, static description of a record type.
/// Pure data; the entity cache turns it into an [`EntityModel`](super::EntityModel).
///

#[derive(Debug)]
pub struct EntityDeclaration {
    /// Rust type name, used as the table name when none is declared.
    pub type_name: &'static str,
    pub table: Option<&'static str>,
    pub schema: Option<&'static str>,
    pub flags: EntityFlags,
    /// Ordered field list.
    pub fields: &'static [FieldDeclaration],
    pub references: &'static [ReferenceDeclaration],
}

///
/// EntityFlags
///
/// Per-type feature switches. `needs_history: None` defers to configuration.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EntityFlags {
    pub needs_history: Option<bool>,
    pub no_version_no: bool,
    pub no_is_active: bool,
    /// Disables both created-by and created-on.
    pub no_created: bool,
    /// Disables both updated-by and updated-on.
    pub no_updated: bool,
}

///
/// FieldDeclaration
///

#[derive(Debug)]
pub struct FieldDeclaration {
    /// Logical (Rust) field name.
    pub name: &'static str,
    /// Physical column override.
    pub column: Option<&'static str>,
    /// Explicit column type; wins over `inferred_type`.
    pub db_type: Option<DbType>,
    /// Type inferred from the field's Rust type.
    pub inferred_type: DbType,
    pub nullable: bool,
    pub size: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub primary_key: bool,
    pub identity: bool,
    pub ignore: IgnoreFlags,
}

///
/// IgnoreFlags
/// Per-operation exclusions from the default column sets.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IgnoreFlags {
    pub insert: bool,
    pub update: bool,
    pub read: bool,
}

///
/// ReferenceDeclaration
///
/// A column in another table that points at this type's key without a
/// database-level constraint.
///

#[derive(Debug)]
pub struct ReferenceDeclaration {
    pub table: &'static str,
    pub column: &'static str,
    /// Referenced key field; defaults to the single primary key.
    pub key: Option<&'static str>,
    /// Whether the referencing table carries the is-active flag.
    pub soft_delete: bool,
    /// Human-readable name for error messages.
    pub display: Option<&'static str>,
}
