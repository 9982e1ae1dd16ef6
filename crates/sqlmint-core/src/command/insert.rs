use crate::{
    command::{ColumnChange, Command, column_param, timestamp_or_param},
    dialect::{Dialect, IdentityFetch},
    error::{Error, ErrorOrigin},
    model::{ColumnModel, EntityModel, ReservedColumn},
    traits::EntityKind,
    types::DbType,
    value::Value,
};
use ulid::Ulid;

// Reserved columns appended after the regular insert columns, in this order.
const RESERVED_ORDER: [ReservedColumn; 6] = [
    ReservedColumn::IsActive,
    ReservedColumn::VersionNo,
    ReservedColumn::CreatedBy,
    ReservedColumn::CreatedOn,
    ReservedColumn::UpdatedBy,
    ReservedColumn::UpdatedOn,
];

///
/// InsertCommand
///

#[derive(Clone, Debug)]
pub struct InsertCommand {
    pub command: Command,
    pub changes: Vec<ColumnChange>,
    /// Version written, when the type carries a version column.
    pub version: Option<i64>,
}

/// Build `INSERT INTO .. VALUES ..` for an entity.
///
/// Generates empty 128-bit keys in place, drops identity keys from the column
/// list, and appends the reserved bookkeeping columns.
pub fn build_insert<E: EntityKind>(
    model: &EntityModel,
    dialect: &dyn Dialect,
    entity: &mut E,
    columns: Option<&[&str]>,
) -> Result<InsertCommand, Error> {
    generate_keys(model, entity)?;

    if model.features.needs_history
        && let Some(created_by) = model.reserved(ReservedColumn::CreatedBy)
        && created_by.read(entity)?.is_null()
    {
        return Err(Error::required_field(
            ErrorOrigin::Command,
            &model.table.to_string(),
            created_by.field,
        ));
    }

    let selected: Vec<&ColumnModel> = match columns {
        Some(names) => model.resolve_columns(names)?,
        None => model.insert_columns().collect(),
    };

    let mut names = Vec::new();
    let mut values = Vec::new();
    let mut command = Command::new(String::new());
    let mut changes = Vec::new();

    for column in selected {
        if column.identity || column.is_reserved() || column.ignore.insert {
            continue;
        }
        let value = column.read(entity)?;
        let param = column_param(column, value.clone());

        names.push(column.name.as_str());
        values.push(param.placeholder());
        command.bind(param);
        if !value.is_null() {
            changes.push(ColumnChange::new(&column.name, Value::Null, value));
        }
    }

    let mut version = None;
    let mut created_by = Value::Null;

    for reserved in RESERVED_ORDER {
        let Some(column) = model.reserved(reserved) else {
            continue;
        };
        if column.ignore.insert {
            continue;
        }

        let (expr, value) = match reserved {
            ReservedColumn::IsActive => (
                dialect.bool_literal(true).to_string(),
                Value::Bool(true),
            ),
            ReservedColumn::VersionNo => {
                let current = column.read(entity)?;
                let start = if current.is_empty_key() {
                    1
                } else {
                    current.as_i64().unwrap_or(1)
                };
                version = Some(start);

                let param = column_param(column, Value::Int(start));
                let placeholder = param.placeholder();
                command.bind(param);
                (placeholder, Value::Int(start))
            }
            ReservedColumn::CreatedBy | ReservedColumn::UpdatedBy => {
                let mut actor = column.read(entity)?;
                if reserved == ReservedColumn::CreatedBy {
                    created_by = actor.clone();
                } else if actor.is_null() {
                    actor = created_by.clone();
                }

                let param = column_param(column, actor.clone());
                let placeholder = param.placeholder();
                command.bind(param);
                (placeholder, actor)
            }
            ReservedColumn::CreatedOn | ReservedColumn::UpdatedOn => {
                let (expr, param) = timestamp_or_param(dialect, column, column.read(entity)?);
                let value = match param {
                    Some(param) => {
                        let value = param.value.clone();
                        command.bind(param);
                        value
                    }
                    // generated by the database; nothing to audit
                    None => Value::Null,
                };
                (expr, value)
            }
        };

        names.push(column.name.as_str());
        values.push(expr);
        if !value.is_null() {
            changes.push(ColumnChange::new(&column.name, Value::Null, value));
        }
    }

    command.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        model.table,
        names.join(", "),
        values.join(", ")
    );

    if model.identity_column().is_some() {
        let fetch = dialect.identity_fetch();
        if let IdentityFetch::Batched(sql) = fetch {
            command.sql.push_str("; ");
            command.sql.push_str(sql);
        }
        command.identity = Some(fetch);
    }

    Ok(InsertCommand {
        command,
        changes,
        version,
    })
}

// Fill empty non-identity 128-bit keys with a fresh ULID.
fn generate_keys<E: EntityKind>(model: &EntityModel, entity: &mut E) -> Result<(), Error> {
    for column in model.primary_keys() {
        if column.identity || column.db_type != DbType::Guid {
            continue;
        }
        if column.read(entity)?.is_empty_key() {
            column.write(entity, &Value::Ulid(Ulid::new()))?;
        }
    }

    Ok(())
}
