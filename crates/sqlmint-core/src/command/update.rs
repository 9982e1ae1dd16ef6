use crate::{
    command::{ColumnChange, Command, column_param, key_predicate, timestamp_or_param},
    dialect::Dialect,
    error::{Error, ErrorOrigin},
    model::{ColumnModel, EntityModel, ReservedColumn},
    traits::EntityKind,
    value::Value,
};

///
/// UpdateCommand
///
/// `is_update_needed` is false when no column differs from the old snapshot;
/// callers must not run `command` in that case.
///

#[derive(Clone, Debug)]
pub struct UpdateCommand {
    pub command: Command,
    pub changes: Vec<ColumnChange>,
    pub is_update_needed: bool,
    /// Version the row is expected to carry before the update.
    pub version: Option<i64>,
}

/// Build `UPDATE .. SET .. WHERE key [AND version]`.
///
/// With an old snapshot only differing columns are written. The version
/// column is always bumped in SQL, never bound.
pub fn build_update<E: EntityKind>(
    model: &EntityModel,
    dialect: &dyn Dialect,
    entity: &E,
    old: Option<&E>,
    columns: Option<&[&str]>,
    concurrency_check: bool,
) -> Result<UpdateCommand, Error> {
    let selected: Vec<&ColumnModel> = match columns {
        Some(names) => model.resolve_columns(names)?,
        None => model.update_columns().collect(),
    };

    let mut sets = Vec::new();
    let mut command = Command::new(String::new());
    let mut changes = Vec::new();

    for column in selected {
        if column.primary_key || column.ignore.update {
            continue;
        }
        // immutable, maintained below, or owned by delete/recover
        if matches!(
            column.reserved,
            Some(
                ReservedColumn::CreatedBy
                    | ReservedColumn::CreatedOn
                    | ReservedColumn::IsActive
                    | ReservedColumn::VersionNo
                    | ReservedColumn::UpdatedBy
                    | ReservedColumn::UpdatedOn
            )
        ) {
            continue;
        }

        let new = column.read(entity)?;
        let previous = match old {
            Some(old) => {
                let previous = column.read(old)?;
                if previous == new {
                    continue;
                }
                previous
            }
            None => Value::Null,
        };

        let param = column_param(column, new.clone());
        sets.push(format!("{} = {}", column.name, param.placeholder()));
        command.bind(param);
        changes.push(ColumnChange::new(&column.name, previous, new));
    }

    let is_update_needed = !sets.is_empty();
    let mut version = None;

    if let Some(column) = model.reserved(ReservedColumn::VersionNo) {
        let current = column.read(entity)?.as_i64().ok_or_else(|| {
            Error::configuration(
                ErrorOrigin::Command,
                format!("{}.{} is not an integer", model.table, column.name),
            )
        })?;
        version = Some(current);

        sets.push(format!("{0} = {0} + 1", column.name));
        changes.push(ColumnChange::new(
            &column.name,
            Value::Int(current),
            Value::Int(current + 1),
        ));
    }

    if let Some(column) = model.reserved(ReservedColumn::UpdatedBy)
        && !column.ignore.update
    {
        let actor = column.read(entity)?;
        let previous = match old {
            Some(old) => column.read(old)?,
            None => Value::Null,
        };
        if previous != actor {
            changes.push(ColumnChange::new(&column.name, previous, actor.clone()));
        }

        let param = column_param(column, actor);
        sets.push(format!("{} = {}", column.name, param.placeholder()));
        command.bind(param);
    }

    if let Some(column) = model.reserved(ReservedColumn::UpdatedOn)
        && !column.ignore.update
    {
        // only a stamp the snapshot shows the caller changed is bound;
        // without a snapshot the entity still carries the stored stamp
        let stamp = match old {
            Some(old) => {
                let stamp = column.read(entity)?;
                if column.read(old)? == stamp {
                    Value::Null
                } else {
                    stamp
                }
            }
            None => Value::Null,
        };

        let (expr, param) = timestamp_or_param(dialect, column, stamp);
        if let Some(param) = param {
            changes.push(ColumnChange::new(&column.name, Value::Null, param.value.clone()));
            command.bind(param);
        }
        sets.push(format!("{} = {expr}", column.name));
    }

    let keys = model.key_values(entity)?;
    let (mut predicate, key_params) = key_predicate(model, &keys)?;
    command.params.extend(key_params);

    if concurrency_check
        && let (Some(column), Some(current)) = (model.reserved(ReservedColumn::VersionNo), version)
    {
        let param = column_param(column, Value::Int(current));
        predicate.push_str(&format!(" AND {} = {}", column.name, param.placeholder()));
        command.bind(param);
    }

    command.sql = format!(
        "UPDATE {} SET {} WHERE {predicate}",
        model.table,
        sets.join(", ")
    );

    Ok(UpdateCommand {
        command,
        changes,
        is_update_needed,
        version,
    })
}
