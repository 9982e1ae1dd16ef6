//! Command builder.
//!
//! Turns a mapping plan plus an entity into statement text and bound
//! parameters. Dialect-specific fragments come from [`Dialect`]; nothing here
//! branches on database kind.
//!
//! Every mutating builder also returns the column changes it captured, which
//! is exactly what the audit trail records for that mutation.

mod delete;
mod insert;
mod select;
mod update;


pub use delete::{DeleteCommand, DeleteMode, build_delete, build_reference_probe};
pub use insert::{InsertCommand, build_insert};
pub use select::{build_select_by_key, key_predicate, resolve_key};
pub use update::{UpdateCommand, build_update};

use crate::{
    audit::csv,
    connection::{Connection, Parameter},
    dialect::{Dialect, IdentityFetch},
    error::Error,
    model::ColumnModel,
    traits::EntityKind,
    value::Value,
};

///
/// Command
///
/// Ready-to-run statement. `identity` is set on inserts whose key is
/// generated by the database.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Command {
    pub sql: String,
    pub params: Vec<Parameter>,
    pub identity: Option<IdentityFetch>,
}

impl Command {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            identity: None,
        }
    }

    pub fn bind(&mut self, param: Parameter) {
        self.params.push(param);
    }

    #[must_use]
    pub fn with_params(mut self, params: impl IntoIterator<Item = Parameter>) -> Self {
        self.params.extend(params);
        self
    }

    /// Run as a non-query. Inserts with a generated key return that key.
    pub fn run<C: Connection + ?Sized>(&self, conn: &mut C) -> Result<(u64, Option<Value>), Error> {
        match self.identity {
            None => Ok((conn.execute(&self.sql, &self.params)?, None)),

            // the fetch is already part of the batch
            Some(IdentityFetch::Batched(_)) => {
                let id = conn.query_scalar(&self.sql, &self.params)?;
                let rows = u64::from(id.as_ref().is_some_and(|v| !v.is_null()));

                Ok((rows, id))
            }

            Some(IdentityFetch::Separate(fetch)) => {
                let rows = conn.execute(&self.sql, &self.params)?;
                let id = conn.query_scalar(fetch, &[])?;

                Ok((rows, id))
            }
        }
    }
}

///
/// Key
///
/// How a caller names one record: a scalar id for single-column keys, or an
/// entity carrying every key field. A mutably borrowed entity also receives
/// the new version and is-active flag after a delete or recover.
///

#[derive(Debug)]
pub enum Key<'a, E> {
    Id(Value),
    Entity(&'a E),
    EntityMut(&'a mut E),
}

impl<E> Key<'_, E> {
    #[must_use]
    pub fn entity(&self) -> Option<&E> {
        match self {
            Self::Id(_) => None,
            Self::Entity(entity) => Some(*entity),
            Self::EntityMut(entity) => Some(&**entity),
        }
    }
}

impl<'a, E: EntityKind> From<&'a E> for Key<'a, E> {
    fn from(entity: &'a E) -> Self {
        Self::Entity(entity)
    }
}

impl<'a, E: EntityKind> From<&'a mut E> for Key<'a, E> {
    fn from(entity: &'a mut E) -> Self {
        Self::EntityMut(entity)
    }
}

impl<E> From<Value> for Key<'_, E> {
    fn from(value: Value) -> Self {
        Self::Id(value)
    }
}

macro_rules! impl_key_from {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl<E> From<$ty> for Key<'_, E> {
                fn from(v: $ty) -> Self {
                    Self::Id(Value::from(v))
                }
            }
        )*
    };
}

impl_key_from!(i32, i64, String, ulid::Ulid);

///
/// ColumnChange
/// One audited column: physical name plus old and new value.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnChange {
    pub column: String,
    pub old: Value,
    pub new: Value,
}

impl ColumnChange {
    #[must_use]
    pub fn new(column: impl Into<String>, old: Value, new: Value) -> Self {
        Self {
            column: column.into(),
            old,
            new,
        }
    }
}

/// Text form of a key: the value itself, or CSV-joined for composite keys.
#[must_use]
pub fn key_text(values: &[Value]) -> String {
    match values {
        [single] => single.to_text().unwrap_or_default(),
        many => many
            .iter()
            .map(|v| csv::field(v.to_text().as_deref()))
            .collect::<Vec<_>>()
            .join(","),
    }
}

// Parameter bound from a mapped column.
pub(crate) fn column_param(column: &ColumnModel, value: Value) -> Parameter {
    Parameter::new(column.name.clone(), value, column.db_type)
}

// Comma-joined physical column names.
pub(crate) fn column_list<'a>(columns: impl IntoIterator<Item = &'a ColumnModel>) -> String {
    columns
        .into_iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// `col = <current timestamp>` or a literal bound value.
pub(crate) fn timestamp_or_param(
    dialect: &dyn Dialect,
    column: &ColumnModel,
    value: Value,
) -> (String, Option<Parameter>) {
    if value.is_null() {
        (dialect.current_timestamp().to_string(), None)
    } else {
        let param = column_param(column, value);
        (param.placeholder(), Some(param))
    }
}
