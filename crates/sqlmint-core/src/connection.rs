//! Connection contract.
//!
//! The driver, its network protocol, and transaction mechanics live behind
//! [`Connection`]. The engine only opens, runs statements, and brackets
//! transactions it needs; everything else belongs to the caller.

use crate::{
    error::Error,
    types::DbType,
    value::Value,
};
use derive_more::Display;

///
/// DialectKind
/// Database family, used only to pick a dialect.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum DialectKind {
    SqlServer,
    Postgres,
    Sqlite,
}

///
/// ConnectionSignature
///
/// Driver kind + connection string. Two connections with equal signatures
/// share one dialect instance.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ConnectionSignature {
    pub driver: DialectKind,
    pub connection_string: String,
}

impl ConnectionSignature {
    #[must_use]
    pub fn new(driver: DialectKind, connection_string: impl Into<String>) -> Self {
        Self {
            driver,
            connection_string: connection_string.into(),
        }
    }
}

///
/// Parameter
///
/// Bound statement parameter. `name` is written without the `@` prefix;
/// statements reference it as `@name`.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub db_type: DbType,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value, db_type: DbType) -> Self {
        Self {
            name: name.into(),
            value,
            db_type,
        }
    }

    /// Parameter typed from its value.
    #[must_use]
    pub fn from_value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let db_type = value.db_type();

        Self::new(name, value, db_type)
    }

    /// Placeholder text as it appears in SQL.
    #[must_use]
    pub fn placeholder(&self) -> String {
        format!("@{}", self.name)
    }
}

///
/// Row
/// One result row: column labels as returned by the driver plus values.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub const fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Value by column label (case-insensitive).
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

///
/// Connection
///
/// An opaque database handle. Errors from the driver are wrapped with
/// [`Error::driver`] and otherwise passed through unchanged.
///

pub trait Connection {
    fn signature(&self) -> ConnectionSignature;

    fn is_open(&self) -> bool;
    fn open(&mut self) -> Result<(), Error>;
    fn close(&mut self) -> Result<(), Error>;

    fn in_transaction(&self) -> bool;
    fn begin(&mut self) -> Result<(), Error>;
    fn commit(&mut self) -> Result<(), Error>;
    fn rollback(&mut self) -> Result<(), Error>;

    /// Run a non-query statement; returns the affected row count.
    fn execute(&mut self, sql: &str, params: &[Parameter]) -> Result<u64, Error>;

    /// Run a statement and return the first column of the first row.
    fn query_scalar(&mut self, sql: &str, params: &[Parameter]) -> Result<Option<Value>, Error>;

    /// Stream rows to `on_row`. Returning `Ok(false)` stops the read early.
    fn query(
        &mut self,
        sql: &str,
        params: &[Parameter],
        on_row: &mut dyn FnMut(Row) -> Result<bool, Error>,
    ) -> Result<(), Error>;
}
