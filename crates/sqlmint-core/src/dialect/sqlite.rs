use crate::{
    command::Command,
    connection::{DialectKind, Parameter},
    dialect::{Dialect, IdentityFetch, SelectParts},
    error::{Error, ErrorOrigin},
    model::{ColumnModel, EntityModel, TableName},
    types::{DbType, ObjectKind},
};

///
/// SqliteDialect
///
/// SQLite only auto-increments a lone `INTEGER PRIMARY KEY`. A composite key
/// with an identity member is emitted as that single key plus a unique index
/// over the full key.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    fn catalog(schema: Option<&str>) -> String {
        match schema {
            Some(schema) => format!("{schema}.sqlite_master"),
            None => "sqlite_master".to_string(),
        }
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    fn identity_fetch(&self) -> IdentityFetch {
        IdentityFetch::Separate("SELECT last_insert_rowid()")
    }

    fn column_type(&self, column: &ColumnModel) -> String {
        if column.identity {
            return "INTEGER PRIMARY KEY AUTOINCREMENT".to_string();
        }

        match column.db_type {
            DbType::Binary => "BLOB",
            DbType::Boolean | DbType::Int16 | DbType::Int32 | DbType::Int64 => "INTEGER",
            DbType::Double | DbType::Single => "REAL",
            // decimals stay text so no precision is lost to REAL affinity
            DbType::Date
            | DbType::DateTime
            | DbType::Decimal
            | DbType::Guid
            | DbType::String
            | DbType::Text => "TEXT",
        }
        .to_string()
    }

    fn column_definition(&self, column: &ColumnModel) -> String {
        if column.identity {
            return format!("{} {}", column.name, self.column_type(column));
        }

        let mut def = format!("{} {}", column.name, self.column_type(column));
        def.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = self.default_value(column) {
            def.push_str(" DEFAULT ");
            def.push_str(&default);
        }

        def
    }

    fn create_table(&self, model: &EntityModel) -> Vec<String> {
        let mut defs: Vec<String> = model
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        let keys: Vec<&str> = model.primary_keys().map(|c| c.name.as_str()).collect();
        let has_identity = model.identity_column().is_some();

        if !has_identity && !keys.is_empty() {
            defs.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} ({})",
            model.table,
            defs.join(", ")
        )];

        if has_identity && keys.len() > 1 {
            let name = format!("ux_{}_key", model.table.name);
            statements.push(self.create_index(&model.table, &name, &keys, true));
        }

        statements
    }

    fn create_index(&self, table: &TableName, name: &str, columns: &[&str], unique: bool) -> String {
        let unique = if unique { "UNIQUE " } else { "" };
        // SQLite qualifies the index, never the table.
        let name = match &table.schema {
            Some(schema) => format!("{schema}.{name}"),
            None => name.to_string(),
        };

        format!(
            "CREATE {unique}INDEX {name} ON {} ({})",
            table.name,
            columns.join(", ")
        )
    }

    fn object_exists(
        &self,
        name: &str,
        kind: ObjectKind,
        schema: Option<&str>,
    ) -> Result<Command, Error> {
        let object_type = match kind {
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Index => "index",
            ObjectKind::Function | ObjectKind::Procedure => {
                return Err(Error::unsupported(
                    ErrorOrigin::Dialect,
                    format!("SQLite has no catalog entry for {kind} objects"),
                ));
            }
        };

        let mut command = Command::new(format!(
            "SELECT COUNT(*) FROM {} WHERE type = '{object_type}' AND name = @name",
            Self::catalog(schema)
        ));
        command.bind(Parameter::from_value("name", name));

        Ok(command)
    }

    fn index_exists(&self, table: &TableName, index: &str) -> Command {
        let mut command = Command::new(format!(
            "SELECT COUNT(*) FROM {} WHERE type = 'index' AND tbl_name = @table AND name = @name",
            Self::catalog(table.schema.as_deref())
        ));
        command.bind(Parameter::from_value("table", table.name.as_str()));
        command.bind(Parameter::from_value("name", index));

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
