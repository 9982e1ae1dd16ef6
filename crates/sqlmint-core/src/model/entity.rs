use crate::{
    config::Config,
    error::{Error, ErrorOrigin},
    model::{ColumnModel, EntityDeclaration, ReservedColumn},
    traits::FieldValues,
    value::Value,
};
use std::fmt::{self, Display};

///
/// TableName
/// Optionally schema-qualified table name.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    #[must_use]
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(ToString::to_string),
            name: name.to_string(),
        }
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

///
/// Features
///
/// Resolved per-type features: a reserved column is enabled when the type
/// declares the field and does not switch it off.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Features {
    pub needs_history: bool,
    pub version_no: bool,
    pub is_active: bool,
    pub created_by: bool,
    pub created_on: bool,
    pub updated_by: bool,
    pub updated_on: bool,
}

impl Features {
    #[must_use]
    pub const fn has(&self, column: ReservedColumn) -> bool {
        match column {
            ReservedColumn::CreatedBy => self.created_by,
            ReservedColumn::CreatedOn => self.created_on,
            ReservedColumn::UpdatedBy => self.updated_by,
            ReservedColumn::UpdatedOn => self.updated_on,
            ReservedColumn::VersionNo => self.version_no,
            ReservedColumn::IsActive => self.is_active,
        }
    }

    const fn set(&mut self, column: ReservedColumn, enabled: bool) {
        match column {
            ReservedColumn::CreatedBy => self.created_by = enabled,
            ReservedColumn::CreatedOn => self.created_on = enabled,
            ReservedColumn::UpdatedBy => self.updated_by = enabled,
            ReservedColumn::UpdatedOn => self.updated_on = enabled,
            ReservedColumn::VersionNo => self.version_no = enabled,
            ReservedColumn::IsActive => self.is_active = enabled,
        }
    }
}

///
/// VirtualForeignKey
///
/// Application-enforced reference from `table.column` to one of this type's
/// key columns. Checked before delete and hard delete only.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VirtualForeignKey {
    /// Physical key column on this type's table.
    pub key_column: String,
    pub table: String,
    pub column: String,
    pub has_is_active: bool,
    pub display: Option<String>,
}

///
/// EntityModel
///
/// Immutable mapping plan for one record type: table, columns, keys, default
/// column sets per operation, references, and resolved features.
///

#[derive(Clone, Debug)]
pub struct EntityModel {
    pub type_name: &'static str,
    pub table: TableName,
    /// Ordered column list (authoritative for DDL and reads).
    pub columns: Vec<ColumnModel>,
    pub references: Vec<VirtualForeignKey>,
    pub features: Features,
    primary_keys: Vec<usize>,
    insert_columns: Vec<usize>,
    update_columns: Vec<usize>,
    read_columns: Vec<usize>,
}

impl EntityModel {
    /// Build a mapping plan from a static declaration.
    pub fn build(decl: &EntityDeclaration, config: &Config) -> Result<Self, Error> {
        let table = TableName::new(decl.schema, decl.table.unwrap_or(decl.type_name));
        let flags = decl.flags;

        let mut features = Features {
            needs_history: flags
                .needs_history
                .unwrap_or(config.defaults.needs_history),
            ..Features::default()
        };
        let mut columns: Vec<ColumnModel> = Vec::with_capacity(decl.fields.len());

        for field in decl.fields {
            let reserved = ReservedColumn::from_field_name(field.name);

            // Reserved fields switched off by the type are not mapped at all.
            if let Some(reserved) = reserved {
                let disabled = match reserved {
                    ReservedColumn::VersionNo => flags.no_version_no,
                    ReservedColumn::IsActive => flags.no_is_active,
                    ReservedColumn::CreatedBy | ReservedColumn::CreatedOn => flags.no_created,
                    ReservedColumn::UpdatedBy | ReservedColumn::UpdatedOn => flags.no_updated,
                };
                if disabled {
                    continue;
                }
                features.set(reserved, true);
            }

            let name = match (field.column, reserved) {
                (Some(column), _) => column.to_string(),
                (None, Some(reserved)) => config.reserved_name(reserved).to_string(),
                (None, None) => field.name.to_string(),
            };
            let db_type = field.db_type.unwrap_or(field.inferred_type);
            let primary_key = field.primary_key || field.identity;

            if primary_key && !db_type.is_keyable() {
                return Err(Error::configuration(
                    ErrorOrigin::Model,
                    format!(
                        "unsupported key type {db_type} for {}.{}",
                        decl.type_name, field.name
                    ),
                ));
            }
            if field.identity && !db_type.supports_identity() {
                return Err(Error::configuration(
                    ErrorOrigin::Model,
                    format!(
                        "identity column {}.{} must be an integer, found {db_type}",
                        decl.type_name, field.name
                    ),
                ));
            }

            let column = ColumnModel {
                field: field.name,
                name,
                db_type,
                size: field.size,
                precision: field.precision,
                scale: field.scale,
                nullable: field.nullable && !primary_key,
                primary_key,
                identity: field.identity,
                ignore: field.ignore,
                reserved,
            };

            // Equal (name, type) pairs collapse; a clash on name alone is a defect.
            if let Some(existing) = columns.iter().find(|c| c.name == column.name) {
                if *existing == column {
                    continue;
                }
                return Err(Error::configuration(
                    ErrorOrigin::Model,
                    format!(
                        "column {} on {} is declared twice with different types",
                        column.name, decl.type_name
                    ),
                ));
            }

            columns.push(column);
        }

        let identity_count = columns.iter().filter(|c| c.identity).count();
        if identity_count > 1 {
            return Err(Error::configuration(
                ErrorOrigin::Model,
                format!(
                    "{} declares {identity_count} identity columns; at most one is allowed",
                    decl.type_name
                ),
            ));
        }

        let positions = |keep: &dyn Fn(&ColumnModel) -> bool| -> Vec<usize> {
            columns
                .iter()
                .enumerate()
                .filter(|(_, c)| keep(c))
                .map(|(i, _)| i)
                .collect()
        };

        let primary_keys = positions(&|c| c.primary_key);
        let insert_columns = positions(&|c| !c.ignore.insert && !c.identity);
        let update_columns = positions(&|c| {
            !c.ignore.update
                && !c.primary_key
                && !c.is(ReservedColumn::CreatedBy)
                && !c.is(ReservedColumn::CreatedOn)
        });
        let read_columns = positions(&|c| !c.ignore.read);

        let mut model = Self {
            type_name: decl.type_name,
            table,
            columns,
            references: Vec::with_capacity(decl.references.len()),
            features,
            primary_keys,
            insert_columns,
            update_columns,
            read_columns,
        };

        for reference in decl.references {
            let key_column = match reference.key {
                Some(field) => model.column_by_field(field).ok_or_else(|| {
                    Error::configuration(
                        ErrorOrigin::Model,
                        format!(
                            "virtual foreign key on {} names unknown key field '{field}'",
                            decl.type_name
                        ),
                    )
                })?,
                None => model.primary_key()?,
            };

            let vfk = VirtualForeignKey {
                key_column: key_column.name.clone(),
                table: reference.table.to_string(),
                column: reference.column.to_string(),
                has_is_active: reference.soft_delete,
                display: reference.display.map(ToString::to_string),
            };
            model.references.push(vfk);
        }

        Ok(model)
    }

    /// Plan for an engine-owned table with no Rust type behind it.
    pub(crate) fn synthetic(
        type_name: &'static str,
        table: TableName,
        columns: Vec<ColumnModel>,
    ) -> Self {
        let positions = |keep: fn(&ColumnModel) -> bool| -> Vec<usize> {
            columns
                .iter()
                .enumerate()
                .filter(|(_, c)| keep(c))
                .map(|(i, _)| i)
                .collect()
        };

        let primary_keys = positions(|c| c.primary_key);
        let insert_columns = positions(|c| !c.identity);
        let update_columns = positions(|c| !c.primary_key);
        let read_columns = positions(|_| true);

        Self {
            type_name,
            table,
            columns,
            references: Vec::new(),
            features: Features::default(),
            primary_keys,
            insert_columns,
            update_columns,
            read_columns,
        }
    }

    // ======================================================================
    // Column lookup
    // ======================================================================

    /// Column by physical name (case-insensitive, as SQL identifiers are).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnModel> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Column by logical field name.
    #[must_use]
    pub fn column_by_field(&self, field: &str) -> Option<&ColumnModel> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Enabled reserved column, if mapped.
    #[must_use]
    pub fn reserved(&self, reserved: ReservedColumn) -> Option<&ColumnModel> {
        self.columns.iter().find(|c| c.is(reserved))
    }

    /// Resolve caller-supplied column names (physical or logical).
    pub fn resolve_columns(&self, names: &[&str]) -> Result<Vec<&ColumnModel>, Error> {
        names
            .iter()
            .map(|name| {
                self.column(name)
                    .or_else(|| self.column_by_field(name))
                    .ok_or_else(|| {
                        Error::configuration(
                            ErrorOrigin::Model,
                            format!("unknown column '{name}' on {}", self.table),
                        )
                    })
            })
            .collect()
    }

    // ======================================================================
    // Keys
    // ======================================================================

    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnModel> {
        self.primary_keys.iter().map(|&i| &self.columns[i])
    }

    #[must_use]
    pub fn has_composite_key(&self) -> bool {
        self.primary_keys.len() > 1
    }

    /// The single primary key column.
    pub fn primary_key(&self) -> Result<&ColumnModel, Error> {
        match self.primary_keys.as_slice() {
            [index] => Ok(&self.columns[*index]),
            [] => Err(Error::configuration(
                ErrorOrigin::Model,
                format!("{} has no primary key", self.type_name),
            )),
            keys => Err(Error::configuration(
                ErrorOrigin::Model,
                format!(
                    "{} has a composite primary key ({} columns); a single key was required",
                    self.type_name,
                    keys.len()
                ),
            )),
        }
    }

    /// The single identity column.
    pub fn identity(&self) -> Result<&ColumnModel, Error> {
        self.identity_column().ok_or_else(|| {
            Error::configuration(
                ErrorOrigin::Model,
                format!("{} has no identity column", self.type_name),
            )
        })
    }

    #[must_use]
    pub fn identity_column(&self) -> Option<&ColumnModel> {
        self.columns.iter().find(|c| c.identity)
    }

    /// Key values of an entity, in key-column order.
    pub fn key_values<E: FieldValues>(&self, entity: &E) -> Result<Vec<Value>, Error> {
        self.primary_keys().map(|c| c.read(entity)).collect()
    }

    // ======================================================================
    // Default column sets
    // ======================================================================

    pub fn insert_columns(&self) -> impl Iterator<Item = &ColumnModel> {
        self.insert_columns.iter().map(|&i| &self.columns[i])
    }

    pub fn update_columns(&self) -> impl Iterator<Item = &ColumnModel> {
        self.update_columns.iter().map(|&i| &self.columns[i])
    }

    pub fn read_columns(&self) -> impl Iterator<Item = &ColumnModel> {
        self.read_columns.iter().map(|&i| &self.columns[i])
    }
}
