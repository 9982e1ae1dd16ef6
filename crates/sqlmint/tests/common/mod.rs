#![allow(dead_code)]

use chrono::NaiveDateTime;
use rusqlite::{
    ToSql,
    types::{ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use sqlmint::{error::Error, prelude::*};
use std::path::PathBuf;
use ulid::Ulid;

// ============================================================================
// Entities
// ============================================================================

///
/// Customer
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[entity(
    table = "customer",
    history,
    reference(table = "orders", column = "customer_id", soft_delete, display = "orders")
)]
pub struct Customer {
    #[column(primary_key, identity)]
    pub id: i64,
    #[column(size = 100)]
    pub name: String,
    pub email: Option<String>,
    #[column(precision = 18, scale = 2)]
    pub credit_limit: Decimal,
    pub created_by: Option<i32>,
    pub created_on: Option<NaiveDateTime>,
    pub updated_by: Option<i32>,
    pub updated_on: Option<NaiveDateTime>,
    pub version_no: i32,
    pub is_active: bool,
}

impl Customer {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            credit_limit: Decimal::new(50_000, 2),
            created_by: Some(1),
            ..Self::default()
        }
    }
}

///
/// Order
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[entity(table = "orders")]
pub struct Order {
    #[column(primary_key, identity)]
    pub id: i64,
    pub customer_id: i64,
    #[column(size = 40)]
    pub reference: String,
    pub created_by: Option<i32>,
    pub created_on: Option<NaiveDateTime>,
    pub version_no: i32,
    pub is_active: bool,
}

///
/// Tag
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[entity(table = "tag", no_version_no, no_is_active, no_created, no_updated)]
pub struct Tag {
    #[column(primary_key)]
    pub id: Ulid,
    #[column(size = 40)]
    pub name: String,
}

// ============================================================================
// SqliteConnection
// ============================================================================

///
/// SqliteConnection
///
/// `Connection` over a throwaway database file. Closing drops the handle;
/// the file lives until the value is dropped.
///

pub struct SqliteConnection {
    path: PathBuf,
    conn: Option<rusqlite::Connection>,
}

impl SqliteConnection {
    pub fn temporary() -> Self {
        let path = std::env::temp_dir().join(format!("sqlmint-{}.db", Ulid::new()));

        Self { path, conn: None }
    }

    fn handle(&self) -> Result<&rusqlite::Connection, Error> {
        self.conn
            .as_ref()
            .ok_or_else(|| Error::driver(std::io::Error::other("connection is closed")))
    }

    fn prepare<'c>(
        conn: &'c rusqlite::Connection,
        sql: &str,
        params: &[Parameter],
    ) -> Result<rusqlite::Statement<'c>, Error> {
        let mut stmt = conn.prepare(sql).map_err(Error::driver)?;

        for param in params {
            let name = param.placeholder();
            if let Some(index) = stmt.parameter_index(&name).map_err(Error::driver)? {
                stmt.raw_bind_parameter(index, Bind(&param.value))
                    .map_err(Error::driver)?;
            }
        }

        Ok(stmt)
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        self.conn = None;
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Connection for SqliteConnection {
    fn signature(&self) -> ConnectionSignature {
        ConnectionSignature::new(DialectKind::Sqlite, self.path.display().to_string())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn open(&mut self) -> Result<(), Error> {
        self.conn = Some(rusqlite::Connection::open(&self.path).map_err(Error::driver)?);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| Error::driver(err))?;
        }
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| !c.is_autocommit())
    }

    fn begin(&mut self) -> Result<(), Error> {
        self.handle()?.execute_batch("BEGIN").map_err(Error::driver)
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.handle()?.execute_batch("COMMIT").map_err(Error::driver)
    }

    fn rollback(&mut self) -> Result<(), Error> {
        self.handle()?.execute_batch("ROLLBACK").map_err(Error::driver)
    }

    fn execute(&mut self, sql: &str, params: &[Parameter]) -> Result<u64, Error> {
        let mut stmt = Self::prepare(self.handle()?, sql, params)?;
        let changed = stmt.raw_execute().map_err(Error::driver)?;

        Ok(changed as u64)
    }

    fn query_scalar(&mut self, sql: &str, params: &[Parameter]) -> Result<Option<Value>, Error> {
        let mut stmt = Self::prepare(self.handle()?, sql, params)?;
        let mut rows = stmt.raw_query();

        match rows.next().map_err(Error::driver)? {
            Some(row) => Ok(Some(read(row.get_ref(0).map_err(Error::driver)?))),
            None => Ok(None),
        }
    }

    fn query(
        &mut self,
        sql: &str,
        params: &[Parameter],
        on_row: &mut dyn FnMut(Row) -> Result<bool, Error>,
    ) -> Result<(), Error> {
        let mut stmt = Self::prepare(self.handle()?, sql, params)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.raw_query();

        while let Some(row) = rows.next().map_err(Error::driver)? {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(read).map_err(Error::driver))
                .collect::<Result<Vec<_>, _>>()?;

            if !on_row(Row::new(columns.clone(), values))? {
                break;
            }
        }

        Ok(())
    }
}

// Values without a native SQLite type travel as their audit text form.
struct Bind<'a>(&'a Value);

impl ToSql for Bind<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        let value = match self.0 {
            Value::Null => Sql::Null,
            Value::Bool(v) => Sql::Integer(i64::from(*v)),
            Value::Int(v) => Sql::Integer(*v),
            Value::Float(v) => Sql::Real(*v),
            Value::Blob(v) => Sql::Blob(v.clone()),
            Value::Text(v) => Sql::Text(v.clone()),
            other => Sql::Text(other.to_text().unwrap_or_default()),
        };

        Ok(ToSqlOutput::Owned(value))
    }
}

fn read(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Blob(v.to_vec()),
    }
}

// ============================================================================
// Setup
// ============================================================================

/// Fresh database with the customer and orders tables.
pub fn database(mapper: &Mapper) -> SqliteConnection {
    let mut conn = SqliteConnection::temporary();

    mapper
        .repository::<Customer, _>(&mut conn)
        .and_then(|mut repo| repo.create_table())
        .expect("customer table");
    mapper
        .repository::<Order, _>(&mut conn)
        .and_then(|mut repo| repo.create_table())
        .expect("orders table");

    conn
}

/// Insert customers by name and return them as stored.
pub fn seed(mapper: &Mapper, conn: &mut SqliteConnection, names: &[&str]) -> Vec<Customer> {
    let mut repo = mapper
        .repository::<Customer, _>(conn)
        .expect("repository");

    names
        .iter()
        .map(|name| {
            let mut customer = Customer::named(name);
            repo.add(&mut customer, None).expect("add customer");
            customer
        })
        .collect()
}
