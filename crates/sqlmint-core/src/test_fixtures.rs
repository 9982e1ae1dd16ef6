//! Entities and a scripted connection shared by unit tests across modules.

use crate::{
    connection::{Connection, ConnectionSignature, DialectKind, Parameter, Row},
    error::Error,
    value::Value,
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlmint_derive::Entity;
use std::collections::VecDeque;
use ulid::Ulid;

///
/// Customer
/// Identity key, every reserved column, history on, one soft-delete reference.
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

///
/// OrderLine
/// Composite key, no is-active flag, no history.
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[entity(table = "order_line", no_is_active)]
pub struct OrderLine {
    #[column(primary_key)]
    pub order_id: i64,
    #[column(primary_key)]
    pub line_no: i32,
    pub product: String,
    pub quantity: i32,
    pub version_no: i32,
    pub is_active: bool,
}

///
/// Tag
/// Generated 128-bit key, schema-qualified, no reserved columns.
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[entity(
    table = "tag",
    schema = "meta",
    no_version_no,
    no_is_active,
    no_created,
    no_updated
)]
pub struct Tag {
    #[column(primary_key)]
    pub id: Ulid,
    #[column(name = "tag_name", size = 40)]
    pub name: String,
    #[column(ignore_update)]
    pub slug: String,
    #[column(ignore_insert, ignore_update, ignore_read)]
    pub search_vector: Option<String>,
    #[column(skip)]
    pub scratch: u8,
}

///
/// FloatKey
/// Invalid: a floating-point primary key.
///

#[derive(Clone, Debug, Default, Entity)]
pub struct FloatKey {
    #[column(primary_key)]
    pub id: f64,
}

///
/// TwoIdentities
/// Invalid: more than one identity column.
///

#[derive(Clone, Debug, Default, Entity)]
pub struct TwoIdentities {
    #[column(primary_key, identity)]
    pub a: i32,
    #[column(primary_key, identity)]
    pub b: i32,
}

// ============================================================================
// RecordingConnection
// ============================================================================

///
/// RecordingConnection
///
/// In-memory connection that records every call and answers from scripted
/// queues. Unscripted executes affect one row; unscripted scalars are NULL.
///

#[derive(Debug)]
pub struct RecordingConnection {
    pub signature: ConnectionSignature,
    pub open: bool,
    pub transaction: bool,
    /// Lifecycle calls in order: open, close, begin, commit, rollback.
    pub events: Vec<&'static str>,
    pub statements: Vec<(String, Vec<Parameter>)>,
    pub affected: VecDeque<u64>,
    pub scalars: VecDeque<Option<Value>>,
    pub results: VecDeque<Vec<Row>>,
    /// Statements containing this text fail with a driver error.
    pub fail_on: Option<&'static str>,
}

impl RecordingConnection {
    pub fn new(driver: DialectKind) -> Self {
        Self {
            signature: ConnectionSignature::new(driver, format!("recording-{}", Ulid::new())),
            open: false,
            transaction: false,
            events: Vec::new(),
            statements: Vec::new(),
            affected: VecDeque::new(),
            scalars: VecDeque::new(),
            results: VecDeque::new(),
            fail_on: None,
        }
    }

    pub fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(|(sql, _)| sql.as_str()).collect()
    }

    pub fn params(&self, index: usize) -> Vec<(&str, &Value)> {
        self.statements[index]
            .1
            .iter()
            .map(|p| (p.name.as_str(), &p.value))
            .collect()
    }

    fn record(&mut self, sql: &str, params: &[Parameter]) -> Result<(), Error> {
        self.statements.push((sql.to_string(), params.to_vec()));

        match self.fail_on {
            Some(needle) if sql.contains(needle) => {
                Err(Error::driver(std::io::Error::other("scripted failure")))
            }
            _ => Ok(()),
        }
    }
}

impl Connection for RecordingConnection {
    fn signature(&self) -> ConnectionSignature {
        self.signature.clone()
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> Result<(), Error> {
        self.open = true;
        self.events.push("open");
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.open = false;
        self.events.push("close");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.transaction
    }

    fn begin(&mut self) -> Result<(), Error> {
        self.transaction = true;
        self.events.push("begin");
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.transaction = false;
        self.events.push("commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Error> {
        self.transaction = false;
        self.events.push("rollback");
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[Parameter]) -> Result<u64, Error> {
        self.record(sql, params)?;
        Ok(self.affected.pop_front().unwrap_or(1))
    }

    fn query_scalar(&mut self, sql: &str, params: &[Parameter]) -> Result<Option<Value>, Error> {
        self.record(sql, params)?;
        Ok(self.scalars.pop_front().flatten())
    }

    fn query(
        &mut self,
        sql: &str,
        params: &[Parameter],
        on_row: &mut dyn FnMut(Row) -> Result<bool, Error>,
    ) -> Result<(), Error> {
        self.record(sql, params)?;

        for row in self.results.pop_front().unwrap_or_default() {
            if !on_row(row)? {
                break;
            }
        }

        Ok(())
    }
}

/// Row from `(label, value)` pairs.
pub fn row(pairs: &[(&str, Value)]) -> Row {
    Row::new(
        pairs.iter().map(|(c, _)| (*c).to_string()).collect(),
        pairs.iter().map(|(_, v)| v.clone()).collect(),
    )
}
