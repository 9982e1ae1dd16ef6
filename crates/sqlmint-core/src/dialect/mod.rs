//! Dialect providers.
//!
//! Every per-database difference lives behind [`Dialect`]: literals, the
//! identity fetch, DDL type names, existence probes, and row bounding. The
//! rest of the engine never branches on database kind.

mod postgres;
mod registry;
mod sqlite;
mod sqlserver;

#[cfg(test)]
mod tests;

pub use postgres::PostgresDialect;
pub use registry::DialectRegistry;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use crate::{
    command::Command,
    connection::DialectKind,
    error::Error,
    model::{ColumnModel, EntityModel, ReservedColumn, TableName},
    types::ObjectKind,
};
use std::fmt::Debug;

///
/// IdentityFetch
///
/// How the generated key of the last insert is retrieved.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdentityFetch {
    /// Appended to the insert; the batch is run as a scalar query.
    Batched(&'static str),

    /// Run as its own scalar query right after the insert.
    Separate(&'static str),
}

impl IdentityFetch {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Batched(sql) | Self::Separate(sql) => sql,
        }
    }
}

///
/// SelectParts
///
/// The pieces of a single-table select. Dialects assemble them, adding row
/// bounding or window emulation where needed.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectParts {
    pub columns: String,
    /// Table name or parenthesized derived table with alias.
    pub from: String,
    pub filter: Option<String>,
    pub order_by: Option<String>,
}

impl SelectParts {
    #[must_use]
    pub fn new(columns: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            columns: columns.into(),
            from: from.into(),
            filter: None,
            order_by: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// `FROM .. [WHERE ..]` tail shared by every shape.
    #[must_use]
    pub fn from_clause(&self) -> String {
        match &self.filter {
            Some(filter) => format!("FROM {} WHERE {filter}", self.from),
            None => format!("FROM {}", self.from),
        }
    }

    /// Plain `SELECT .. FROM .. [WHERE ..] [ORDER BY ..]`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut sql = format!("SELECT {} {}", self.columns, self.from_clause());
        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        sql
    }
}

// ============================================================================
// Dialect
// ============================================================================

///
/// Dialect
///
/// One implementation per database family. Instances are stateless apart
/// from tuning read from configuration and are shared across threads.
///

pub trait Dialect: Debug + Send + Sync {
    fn kind(&self) -> DialectKind;

    // ------------------------------------------------------------------
    // Fragments
    // ------------------------------------------------------------------

    fn bool_literal(&self, value: bool) -> &'static str;

    fn current_timestamp(&self) -> &'static str;

    fn identity_fetch(&self) -> IdentityFetch;

    /// DDL type for a column, including identity syntax when the column is
    /// generated by the database.
    fn column_type(&self, column: &ColumnModel) -> String;

    // ------------------------------------------------------------------
    // Catalog probes (return a scalar count)
    // ------------------------------------------------------------------

    fn object_exists(
        &self,
        name: &str,
        kind: ObjectKind,
        schema: Option<&str>,
    ) -> Result<Command, Error>;

    fn index_exists(&self, table: &TableName, index: &str) -> Command;

    // ------------------------------------------------------------------
    // Row bounding
    // ------------------------------------------------------------------

    /// Select at most `limit` rows in the parts' order.
    fn select_top(&self, parts: &SelectParts, limit: u64) -> String;

    /// Offset paging over the parts' order.
    fn select_page(&self, parts: &SelectParts, offset: u64, limit: u64) -> String;

    /// Bounded existence probe returning at most one row.
    fn select_exists(&self, from: &str, filter: &str) -> String;

    /// Re-sort an inner bounded query into the caller's order.
    fn wrap_reorder(&self, inner: &str, order_by: &str) -> String {
        format!("SELECT * FROM ({inner}) AS page ORDER BY {order_by}")
    }

    // ------------------------------------------------------------------
    // DDL
    // ------------------------------------------------------------------

    /// Statements creating the table, in execution order.
    fn create_table(&self, model: &EntityModel) -> Vec<String> {
        let mut defs: Vec<String> = model
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        let keys: Vec<&str> = model.primary_keys().map(|c| c.name.as_str()).collect();
        if !keys.is_empty() {
            defs.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        vec![format!("CREATE TABLE {} ({})", model.table, defs.join(", "))]
    }

    fn column_definition(&self, column: &ColumnModel) -> String {
        let mut def = format!("{} {}", column.name, self.column_type(column));
        def.push_str(if column.nullable { " NULL" } else { " NOT NULL" });

        if let Some(default) = self.default_value(column) {
            def.push_str(" DEFAULT ");
            def.push_str(&default);
        }

        def
    }

    /// Column default for engine-maintained columns.
    fn default_value(&self, column: &ColumnModel) -> Option<String> {
        match column.reserved? {
            ReservedColumn::CreatedOn | ReservedColumn::UpdatedOn => {
                Some(self.current_timestamp().to_string())
            }
            ReservedColumn::IsActive => Some(self.bool_literal(true).to_string()),
            ReservedColumn::VersionNo => Some("1".to_string()),
            ReservedColumn::CreatedBy | ReservedColumn::UpdatedBy => None,
        }
    }

    fn create_index(&self, table: &TableName, name: &str, columns: &[&str], unique: bool) -> String {
        let unique = if unique { "UNIQUE " } else { "" };

        format!(
            "CREATE {unique}INDEX {name} ON {table} ({})",
            columns.join(", ")
        )
    }

    fn drop_table(&self, table: &TableName) -> String {
        format!("DROP TABLE {table}")
    }
}

// Shared helper: size or a default for variable-length types.
pub(crate) fn sized(base: &str, size: Option<u32>, fallback: &str) -> String {
    match size {
        Some(size) => format!("{base}({size})"),
        None => format!("{base}({fallback})"),
    }
}

pub(crate) fn decimal(base: &str, column: &ColumnModel) -> String {
    let precision = column.precision.unwrap_or(18);
    let scale = column.scale.unwrap_or(2);

    format!("{base}({precision}, {scale})")
}
