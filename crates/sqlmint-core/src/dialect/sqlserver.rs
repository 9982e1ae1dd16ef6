use crate::{
    command::Command,
    connection::{DialectKind, Parameter},
    dialect::{Dialect, IdentityFetch, SelectParts, decimal, sized},
    error::Error,
    model::{ColumnModel, TableName},
    types::{DbType, ObjectKind},
};

/// First major version with `OFFSET .. FETCH NEXT`.
const OFFSET_FETCH_SINCE: u32 = 11;

///
/// SqlServerDialect
///

#[derive(Clone, Copy, Debug)]
pub struct SqlServerDialect {
    major_version: u32,
}

impl SqlServerDialect {
    #[must_use]
    pub const fn new(major_version: u32) -> Self {
        Self { major_version }
    }

    const fn has_offset_fetch(self) -> bool {
        self.major_version >= OFFSET_FETCH_SINCE
    }
}

impl Default for SqlServerDialect {
    fn default() -> Self {
        Self::new(16)
    }
}

impl Dialect for SqlServerDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlServer
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn current_timestamp(&self) -> &'static str {
        "GETDATE()"
    }

    fn identity_fetch(&self) -> IdentityFetch {
        IdentityFetch::Batched("SELECT CAST(SCOPE_IDENTITY() AS BIGINT)")
    }

    fn column_type(&self, column: &ColumnModel) -> String {
        let base = match column.db_type {
            DbType::Binary => sized("VARBINARY", column.size, "MAX"),
            DbType::Boolean => "BIT".to_string(),
            DbType::Date => "DATE".to_string(),
            DbType::DateTime => "DATETIME2".to_string(),
            DbType::Decimal => decimal("DECIMAL", column),
            DbType::Double => "FLOAT".to_string(),
            DbType::Guid => "UNIQUEIDENTIFIER".to_string(),
            DbType::Int16 => "SMALLINT".to_string(),
            DbType::Int32 => "INT".to_string(),
            DbType::Int64 => "BIGINT".to_string(),
            DbType::Single => "REAL".to_string(),
            DbType::String => sized("NVARCHAR", column.size, "255"),
            DbType::Text => "NVARCHAR(MAX)".to_string(),
        };

        if column.identity {
            format!("{base} IDENTITY(1,1)")
        } else {
            base
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
                "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME = @name",
                "TABLE_SCHEMA",
            ),
            ObjectKind::View => (
                "SELECT COUNT(*) FROM INFORMATION_SCHEMA.VIEWS WHERE TABLE_NAME = @name",
                "TABLE_SCHEMA",
            ),
            ObjectKind::Function => (
                "SELECT COUNT(*) FROM INFORMATION_SCHEMA.ROUTINES WHERE ROUTINE_TYPE = 'FUNCTION' AND ROUTINE_NAME = @name",
                "ROUTINE_SCHEMA",
            ),
            ObjectKind::Procedure => (
                "SELECT COUNT(*) FROM INFORMATION_SCHEMA.ROUTINES WHERE ROUTINE_TYPE = 'PROCEDURE' AND ROUTINE_NAME = @name",
                "ROUTINE_SCHEMA",
            ),
            ObjectKind::Index => (
                "SELECT COUNT(*) FROM sys.indexes i JOIN sys.objects o ON o.object_id = i.object_id WHERE i.name = @name",
                "SCHEMA_NAME(o.schema_id)",
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
            "SELECT COUNT(*) FROM sys.indexes WHERE name = @name AND object_id = OBJECT_ID(@table)",
        );
        command.bind(Parameter::from_value("name", index));
        command.bind(Parameter::from_value("table", table.to_string()));

        command
    }

    fn select_top(&self, parts: &SelectParts, limit: u64) -> String {
        let mut sql = format!("SELECT TOP ({limit}) {} {}", parts.columns, parts.from_clause());
        if let Some(order_by) = &parts.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        sql
    }

    fn select_page(&self, parts: &SelectParts, offset: u64, limit: u64) -> String {
        // OFFSET requires an ORDER BY; (SELECT NULL) keeps server order.
        let order_by = parts.order_by.as_deref().unwrap_or("(SELECT NULL)");

        if self.has_offset_fetch() {
            return format!(
                "SELECT {} {} ORDER BY {order_by} OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY",
                parts.columns,
                parts.from_clause(),
            );
        }

        // ROW_NUMBER() numbers the whole filtered set before slicing.
        let first = offset.saturating_add(1);
        let last = offset.saturating_add(limit);
        format!(
            "SELECT * FROM (SELECT {}, ROW_NUMBER() OVER (ORDER BY {order_by}) AS row_num {}) AS paged \
             WHERE row_num BETWEEN {first} AND {last} ORDER BY row_num",
            parts.columns,
            parts.from_clause(),
        )
    }

    fn select_exists(&self, from: &str, filter: &str) -> String {
        format!("SELECT TOP 1 1 FROM {from} WHERE {filter}")
    }
}
