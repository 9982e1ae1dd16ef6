use crate::{
    command::Command,
    connection::{DialectKind, Parameter},
    dialect::{Dialect, IdentityFetch, SelectParts, decimal, sized},
    error::Error,
    model::{ColumnModel, TableName},
    types::{DbType, ObjectKind},
};

///
/// PostgresDialect
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    fn current_timestamp(&self) -> &'static str {
        "now()"
    }

    fn identity_fetch(&self) -> IdentityFetch {
        IdentityFetch::Separate("SELECT lastval()")
    }

    fn column_type(&self, column: &ColumnModel) -> String {
        if column.identity {
            return match column.db_type {
                DbType::Int16 => "SMALLSERIAL",
                DbType::Int32 => "SERIAL",
                _ => "BIGSERIAL",
            }
            .to_string();
        }

        match column.db_type {
            DbType::Binary => "BYTEA".to_string(),
            DbType::Boolean => "BOOLEAN".to_string(),
            DbType::Date => "DATE".to_string(),
            DbType::DateTime => "TIMESTAMP".to_string(),
            DbType::Decimal => decimal("NUMERIC", column),
            DbType::Double => "DOUBLE PRECISION".to_string(),
            DbType::Guid => "UUID".to_string(),
            DbType::Int16 => "SMALLINT".to_string(),
            DbType::Int32 => "INTEGER".to_string(),
            DbType::Int64 => "BIGINT".to_string(),
            DbType::Single => "REAL".to_string(),
            DbType::String => sized("VARCHAR", column.size, "255"),
            DbType::Text => "TEXT".to_string(),
        }
    }

    fn object_exists(
        &self,
        name: &str,
        kind: ObjectKind,
        schema: Option<&str>,
    ) -> Result<Command, Error> {
        let (sql, schema_column) = match kind {
            ObjectKind::Table => (
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_type = 'BASE TABLE' AND table_name = @name",
                "table_schema",
            ),
            ObjectKind::View => (
                "SELECT COUNT(*) FROM information_schema.views WHERE table_name = @name",
                "table_schema",
            ),
            ObjectKind::Function => (
                "SELECT COUNT(*) FROM information_schema.routines WHERE routine_type = 'FUNCTION' AND routine_name = @name",
                "routine_schema",
            ),
            ObjectKind::Procedure => (
                "SELECT COUNT(*) FROM information_schema.routines WHERE routine_type = 'PROCEDURE' AND routine_name = @name",
                "routine_schema",
            ),
            ObjectKind::Index => (
                "SELECT COUNT(*) FROM pg_indexes WHERE indexname = @name",
                "schemaname",
            ),
        };

        let mut command = Command::new(sql);
        command.bind(Parameter::from_value("name", name));
        if let Some(schema) = schema {
            command.sql.push_str(&format!(" AND {schema_column} = @schema"));
            command.bind(Parameter::from_value("schema", schema));
        }

        Ok(command)
    }

    fn index_exists(&self, table: &TableName, index: &str) -> Command {
        let mut command = Command::new(
            "SELECT COUNT(*) FROM pg_indexes WHERE indexname = @name AND tablename = @table",
        );
        command.bind(Parameter::from_value("name", index));
        command.bind(Parameter::from_value("table", table.name.as_str()));
        if let Some(schema) = &table.schema {
            command.sql.push_str(" AND schemaname = @schema");
            command.bind(Parameter::from_value("schema", schema.as_str()));
        }

        command
    }

    fn select_top(&self, parts: &SelectParts, limit: u64) -> String {
        format!("{} LIMIT {limit}", parts.render())
    }

    fn select_page(&self, parts: &SelectParts, offset: u64, limit: u64) -> String {
        format!("{} LIMIT {limit} OFFSET {offset}", parts.render())
    }

    fn select_exists(&self, from: &str, filter: &str) -> String {
        format!("SELECT 1 FROM {from} WHERE {filter} LIMIT 1")
    }
}
