use crate::{
    command::{Command, Key, column_list, column_param},
    connection::Parameter,
    error::{Error, ErrorOrigin},
    model::{ColumnModel, EntityModel},
    traits::EntityKind,
    value::Value,
};

/// Key values for a caller-supplied key, in key-column order.
///
/// A scalar id only names a record of a single-key type; composite keys need
/// an entity carrying every key field.
pub fn resolve_key<E: EntityKind>(model: &EntityModel, key: &Key<'_, E>) -> Result<Vec<Value>, Error> {
    match key {
        Key::Id(value) => {
            if model.has_composite_key() {
                return Err(Error::configuration(
                    ErrorOrigin::Command,
                    format!(
                        "{} has a composite key; pass an entity instead of a scalar id",
                        model.type_name
                    ),
                ));
            }
            model.primary_key()?;

            Ok(vec![value.clone()])
        }
        Key::Entity(entity) => model.key_values(*entity),
        Key::EntityMut(entity) => model.key_values(&**entity),
    }
}

/// `k1 = @k1 AND k2 = @k2 ..` with one parameter per key column.
pub fn key_predicate(
    model: &EntityModel,
    values: &[Value],
) -> Result<(String, Vec<Parameter>), Error> {
    let keys: Vec<&ColumnModel> = model.primary_keys().collect();

    if keys.is_empty() {
        return Err(Error::configuration(
            ErrorOrigin::Command,
            format!("{} has no primary key", model.type_name),
        ));
    }
    if keys.len() != values.len() {
        return Err(Error::configuration(
            ErrorOrigin::Command,
            format!(
                "{} expects {} key values, got {}",
                model.type_name,
                keys.len(),
                values.len()
            ),
        ));
    }

    let mut terms = Vec::with_capacity(keys.len());
    let mut params = Vec::with_capacity(keys.len());
    for (column, value) in keys.into_iter().zip(values) {
        let param = column_param(column, value.clone());
        terms.push(format!("{} = {}", column.name, param.placeholder()));
        params.push(param);
    }

    Ok((terms.join(" AND "), params))
}

/// `SELECT cols FROM table WHERE key`.
pub fn build_select_by_key(
    model: &EntityModel,
    columns: &[&ColumnModel],
    values: &[Value],
) -> Result<Command, Error> {
    let (predicate, params) = key_predicate(model, values)?;

    Ok(Command::new(format!(
        "SELECT {} FROM {} WHERE {predicate}",
        column_list(columns.iter().copied()),
        model.table
    ))
    .with_params(params))
}
