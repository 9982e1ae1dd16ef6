use crate::{
    audit::Operation,
    command::{ColumnChange, Command, column_param, key_predicate},
    connection::Parameter,
    dialect::Dialect,
    error::{Error, ErrorOrigin},
    model::{EntityModel, ReservedColumn, VirtualForeignKey},
    value::Value,
};

///
/// DeleteMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeleteMode {
    /// Flip is-active off and bump the version.
    Soft,
    /// Remove the row, regardless of is-active.
    Hard,
    /// Flip is-active back on and bump the version.
    Recover,
}

impl DeleteMode {
    #[must_use]
    pub const fn operation(self) -> Operation {
        match self {
            Self::Soft | Self::Hard => Operation::Delete,
            Self::Recover => Operation::Recover,
        }
    }
}

///
/// DeleteCommand
///

#[derive(Clone, Debug)]
pub struct DeleteCommand {
    pub command: Command,
    pub changes: Vec<ColumnChange>,
}

/// Build the statement for a delete, hard delete, or recover.
///
/// `version` is the row version the caller expects; it is compared only when
/// the concurrency check is on and the type has a version column.
pub fn build_delete(
    model: &EntityModel,
    dialect: &dyn Dialect,
    key: &[Value],
    version: Option<i64>,
    updated_by: &Value,
    mode: DeleteMode,
    concurrency_check: bool,
) -> Result<DeleteCommand, Error> {
    let (mut predicate, key_params) = key_predicate(model, key)?;
    let mut command = Command::new(String::new());
    let mut changes = Vec::new();
    let version_column = model.reserved(ReservedColumn::VersionNo);

    let statement = if mode == DeleteMode::Hard {
        format!("DELETE FROM {}", model.table)
    } else {
        let Some(is_active) = model.reserved(ReservedColumn::IsActive) else {
            return Err(Error::unsupported(
                ErrorOrigin::Command,
                format!("{} has no is-active column; {mode:?} is unavailable", model.type_name),
            ));
        };
        let target = mode == DeleteMode::Recover;

        let mut sets = vec![format!(
            "{} = {}",
            is_active.name,
            dialect.bool_literal(target)
        )];
        changes.push(ColumnChange::new(
            &is_active.name,
            Value::Bool(!target),
            Value::Bool(target),
        ));

        if let Some(column) = version_column {
            sets.push(format!("{0} = {0} + 1", column.name));
            if let Some(current) = version {
                changes.push(ColumnChange::new(
                    &column.name,
                    Value::Int(current),
                    Value::Int(current + 1),
                ));
            }
        }
        if let Some(column) = model.reserved(ReservedColumn::UpdatedBy) {
            let param = column_param(column, updated_by.clone());
            sets.push(format!("{} = {}", column.name, param.placeholder()));
            command.bind(param);
        }
        if let Some(column) = model.reserved(ReservedColumn::UpdatedOn) {
            sets.push(format!("{} = {}", column.name, dialect.current_timestamp()));
        }

        format!("UPDATE {} SET {}", model.table, sets.join(", "))
    };

    command.params.extend(key_params);

    if concurrency_check
        && let (Some(column), Some(current)) = (version_column, version)
    {
        let param = column_param(column, Value::Int(current));
        predicate.push_str(&format!(" AND {} = {}", column.name, param.placeholder()));
        command.bind(param);
    }

    command.sql = format!("{statement} WHERE {predicate}");

    Ok(DeleteCommand { command, changes })
}

/// Bounded probe for one active row referencing `key` through `vfk`.
#[must_use]
pub fn build_reference_probe(
    dialect: &dyn Dialect,
    vfk: &VirtualForeignKey,
    is_active_column: &str,
    key: &Value,
) -> Command {
    let mut filter = format!("{} = @key", vfk.column);
    if vfk.has_is_active {
        filter.push_str(&format!(
            " AND {is_active_column} = {}",
            dialect.bool_literal(true)
        ));
    }

    Command::new(dialect.select_exists(&vfk.table, &filter))
        .with_params([Parameter::from_value("key", key.clone())])
}
