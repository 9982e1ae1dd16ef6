//! Audit trail.
//!
//! One audit unit per successful insert, update, delete, or recover on a type
//! with history enabled. Two physical layouts share one contract: open a unit,
//! append its column changes, then flush it inside the caller's transaction.
//!
//! - CSV: one row per unit; changes serialized into a single text column.
//! - Key-value: one header row per unit plus one detail row per change.

pub mod csv;

#[cfg(test)]
mod tests;

use crate::{
    command::{ColumnChange, Command},
    config::{AuditConfig, AuditLayout},
    connection::{Connection, ConnectionSignature, Parameter, Row},
    dialect::{Dialect, IdentityFetch},
    error::{Error, ErrorClass, ErrorOrigin},
    model::{ColumnModel, EntityModel, IgnoreFlags, TableName},
    traits::FieldValue,
    types::{DbType, ObjectKind},
    value::Value,
};
use chrono::NaiveDateTime;
use derive_more::Display;
use parking_lot::RwLock;
use std::collections::HashSet;

///
/// Operation
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Recover,
}

impl Operation {
    /// Single-letter code stored in the audit table.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Insert => "I",
            Self::Update => "U",
            Self::Delete => "D",
            Self::Recover => "R",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "I" => Some(Self::Insert),
            "U" => Some(Self::Update),
            "D" => Some(Self::Delete),
            "R" => Some(Self::Recover),
            _ => None,
        }
    }
}

///
/// AuditHeader
/// What every audit unit records regardless of layout.
///

#[derive(Clone, Debug, PartialEq)]
pub struct AuditHeader {
    /// Audited table, schema-qualified when it has a schema.
    pub table: String,
    /// Key text; composite keys are CSV-joined.
    pub record_id: String,
    pub operation: Operation,
    /// Row version after the mutation.
    pub version: Option<i64>,
    pub actor: Value,
}

///
/// AuditRecord
/// One decoded audit unit. Old and new values come back as text.
///

#[derive(Clone, Debug, PartialEq)]
pub struct AuditRecord {
    pub operation: Operation,
    pub version: Option<i64>,
    pub actor: Value,
    pub recorded_on: Option<NaiveDateTime>,
    pub changes: Vec<ColumnChange>,
}

// ============================================================================
// AuditStore
// ============================================================================

///
/// AuditStore
///
/// Audit tables for one configuration. Remembers which connections already
/// have the tables so the existence probe runs once per signature.
///

#[derive(Debug)]
pub struct AuditStore {
    layout: AuditLayout,
    header: EntityModel,
    detail: EntityModel,
    ensured: RwLock<HashSet<ConnectionSignature>>,
}

impl AuditStore {
    #[must_use]
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            layout: config.layout,
            header: header_model(config),
            detail: detail_model(config),
            ensured: RwLock::new(HashSet::new()),
        }
    }

    #[must_use]
    pub const fn layout(&self) -> AuditLayout {
        self.layout
    }

    /// Create the audit tables on first use when they are missing.
    pub fn ensure_audit_store<C: Connection + ?Sized>(
        &self,
        conn: &mut C,
        dialect: &dyn Dialect,
    ) -> Result<(), Error> {
        let signature = conn.signature();
        if self.ensured.read().contains(&signature) {
            return Ok(());
        }

        let models = match self.layout {
            AuditLayout::Csv => vec![&self.header],
            AuditLayout::KeyValue => vec![&self.header, &self.detail],
        };

        for model in models {
            let probe = dialect.object_exists(
                &model.table.name,
                ObjectKind::Table,
                model.table.schema.as_deref(),
            )?;
            if scalar_count(conn.query_scalar(&probe.sql, &probe.params)?) > 0 {
                continue;
            }

            for sql in dialect.create_table(model) {
                conn.execute(&sql, &[])?;
            }
            tracing::info!(table = %model.table, layout = ?self.layout, "audit table created");
        }

        self.ensured.write().insert(signature);

        Ok(())
    }

    /// Forget which connections have been bootstrapped.
    pub fn reset(&self) {
        self.ensured.write().clear();
    }

    /// Open a unit. Changes are appended, then the unit is flushed once.
    #[must_use]
    pub const fn begin(&self, header: AuditHeader) -> AuditUnit<'_> {
        AuditUnit {
            store: self,
            header,
            details: Vec::new(),
        }
    }

    // ======================================================================
    // History
    // ======================================================================

    /// Every audit unit recorded for one row, oldest first.
    pub fn read_history<C: Connection + ?Sized>(
        &self,
        conn: &mut C,
        table: &str,
        record_id: &str,
    ) -> Result<Vec<AuditRecord>, Error> {
        let columns = match self.layout {
            AuditLayout::Csv => "id, operation, record_version, created_by, created_on, changes",
            AuditLayout::KeyValue => "id, operation, record_version, created_by, created_on",
        };
        let sql = format!(
            "SELECT {columns} FROM {} WHERE table_name = @table_name AND record_id = @record_id ORDER BY id",
            self.header.table
        );
        let params = [
            Parameter::new("table_name", Value::from(table), DbType::String),
            Parameter::new("record_id", Value::from(record_id), DbType::String),
        ];
        let headers = collect_rows(conn, &sql, &params)?;

        let mut records = Vec::with_capacity(headers.len());
        for row in headers {
            let changes = match self.layout {
                AuditLayout::Csv => match row.get("changes").and_then(Value::as_text) {
                    Some(text) => csv::decode_changes(text)?,
                    None => Vec::new(),
                },
                AuditLayout::KeyValue => {
                    let audit_id = row.get("id").cloned().unwrap_or(Value::Null);
                    self.read_details(conn, audit_id)?
                }
            };

            records.push(decode_header(&row, changes)?);
        }

        Ok(records)
    }

    fn read_details<C: Connection + ?Sized>(
        &self,
        conn: &mut C,
        audit_id: Value,
    ) -> Result<Vec<ColumnChange>, Error> {
        let sql = format!(
            "SELECT column_name, old_value, new_value FROM {} WHERE audit_id = @audit_id ORDER BY id",
            self.detail.table
        );
        let params = [Parameter::new("audit_id", audit_id, DbType::Int64)];

        collect_rows(conn, &sql, &params)?
            .into_iter()
            .map(|row| {
                let column = row
                    .get("column_name")
                    .and_then(Value::as_text)
                    .ok_or_else(|| {
                        Error::conversion(ErrorOrigin::Audit, "audit detail row has no column name")
                    })?;

                Ok(ColumnChange::new(
                    column,
                    text_or_null(row.get("old_value")),
                    text_or_null(row.get("new_value")),
                ))
            })
            .collect()
    }

    fn header_command(
        &self,
        dialect: &dyn Dialect,
        header: &AuditHeader,
        changes: Option<String>,
    ) -> Command {
        let actor_type = self
            .header
            .column("created_by")
            .map_or(DbType::Int32, |c| c.db_type);

        let mut names = vec![
            "table_name",
            "record_id",
            "operation",
            "record_version",
            "created_by",
            "created_on",
        ];
        let mut values = vec![
            "@table_name",
            "@record_id",
            "@operation",
            "@record_version",
            "@created_by",
            dialect.current_timestamp(),
        ];
        let mut command = Command::new(String::new()).with_params([
            Parameter::new("table_name", Value::from(header.table.as_str()), DbType::String),
            Parameter::new("record_id", Value::from(header.record_id.as_str()), DbType::String),
            Parameter::new("operation", Value::from(header.operation.code()), DbType::String),
            Parameter::new("record_version", Value::from(header.version), DbType::Int64),
            Parameter::new("created_by", header.actor.clone(), actor_type),
        ]);

        if let Some(changes) = changes {
            names.push("changes");
            values.push("@changes");
            command.bind(Parameter::new("changes", Value::Text(changes), DbType::Text));
        }

        command.sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.header.table,
            names.join(", "),
            values.join(", ")
        );

        command
    }
}

///
/// AuditUnit
///
/// An open audit unit. Dropping it without `flush` records nothing.
///

#[derive(Debug)]
pub struct AuditUnit<'s> {
    store: &'s AuditStore,
    header: AuditHeader,
    details: Vec<ColumnChange>,
}

impl AuditUnit<'_> {
    pub fn append(&mut self, change: ColumnChange) {
        self.details.push(change);
    }

    pub fn extend(&mut self, changes: impl IntoIterator<Item = ColumnChange>) {
        self.details.extend(changes);
    }

    #[must_use]
    pub fn details(&self) -> &[ColumnChange] {
        &self.details
    }

    /// Write the unit. Returns the number of change details recorded.
    pub fn flush<C: Connection + ?Sized>(
        self,
        conn: &mut C,
        dialect: &dyn Dialect,
    ) -> Result<usize, Error> {
        let store = self.store;

        match store.layout {
            AuditLayout::Csv => {
                let changes = csv::encode_changes(&self.details);
                store
                    .header_command(dialect, &self.header, Some(changes))
                    .run(conn)?;
            }

            AuditLayout::KeyValue => {
                let mut command = store.header_command(dialect, &self.header, None);
                let fetch = dialect.identity_fetch();
                if let IdentityFetch::Batched(sql) = fetch {
                    command.sql.push_str("; ");
                    command.sql.push_str(sql);
                }
                command.identity = Some(fetch);

                let (_, id) = command.run(conn)?;
                let audit_id = id.as_ref().and_then(i64::from_value).ok_or_else(|| {
                    Error::new(
                        ErrorClass::Conversion,
                        ErrorOrigin::Audit,
                        "audit header insert returned no id",
                    )
                })?;

                let sql = format!(
                    "INSERT INTO {} (audit_id, column_name, old_value, new_value) \
                     VALUES (@audit_id, @column_name, @old_value, @new_value)",
                    store.detail.table
                );
                for change in &self.details {
                    let params = [
                        Parameter::new("audit_id", Value::Int(audit_id), DbType::Int64),
                        Parameter::new("column_name", Value::from(change.column.as_str()), DbType::String),
                        Parameter::new("old_value", Value::from(change.old.to_text()), DbType::Text),
                        Parameter::new("new_value", Value::from(change.new.to_text()), DbType::Text),
                    ];
                    conn.execute(&sql, &params)?;
                }
            }
        }

        tracing::debug!(
            table = %self.header.table,
            record = %self.header.record_id,
            operation = %self.header.operation,
            details = self.details.len(),
            "audit unit written"
        );

        Ok(self.details.len())
    }
}

// ============================================================================
// Table layouts
// ============================================================================

fn column(name: &'static str, db_type: DbType, size: Option<u32>, nullable: bool) -> ColumnModel {
    ColumnModel {
        field: name,
        name: name.to_string(),
        db_type,
        size,
        precision: None,
        scale: None,
        nullable,
        primary_key: false,
        identity: false,
        ignore: IgnoreFlags::default(),
        reserved: None,
    }
}

fn identity_key() -> ColumnModel {
    ColumnModel {
        primary_key: true,
        identity: true,
        ..column("id", DbType::Int64, None, false)
    }
}

fn header_model(config: &AuditConfig) -> EntityModel {
    let mut columns = vec![
        identity_key(),
        column("table_name", DbType::String, Some(128), false),
        column("record_id", DbType::String, Some(256), false),
        column("operation", DbType::String, Some(1), false),
        column("record_version", DbType::Int64, None, true),
        column("created_by", config.actor_type, None, true),
        column("created_on", DbType::DateTime, None, false),
    ];
    if config.layout == AuditLayout::Csv {
        columns.push(column("changes", DbType::Text, None, true));
    }

    EntityModel::synthetic("AuditHeader", TableName::new(None, &config.table), columns)
}

fn detail_model(config: &AuditConfig) -> EntityModel {
    let columns = vec![
        identity_key(),
        column("audit_id", DbType::Int64, None, false),
        column("column_name", DbType::String, Some(128), false),
        column("old_value", DbType::Text, None, true),
        column("new_value", DbType::Text, None, true),
    ];

    EntityModel::synthetic(
        "AuditDetail",
        TableName::new(None, &config.detail_table),
        columns,
    )
}

// ============================================================================
// Decoding helpers
// ============================================================================

fn decode_header(row: &Row, changes: Vec<ColumnChange>) -> Result<AuditRecord, Error> {
    let code = row.get("operation").and_then(Value::as_text).unwrap_or_default();
    let operation = Operation::from_code(code).ok_or_else(|| {
        Error::conversion(
            ErrorOrigin::Audit,
            format!("unknown audit operation code '{code}'"),
        )
    })?;

    Ok(AuditRecord {
        operation,
        version: row.get("record_version").and_then(i64::from_value),
        actor: row.get("created_by").cloned().unwrap_or(Value::Null),
        recorded_on: row.get("created_on").and_then(NaiveDateTime::from_value),
        changes,
    })
}

fn text_or_null(value: Option<&Value>) -> Value {
    value
        .and_then(Value::to_text)
        .map_or(Value::Null, Value::Text)
}

pub(crate) fn collect_rows<C: Connection + ?Sized>(
    conn: &mut C,
    sql: &str,
    params: &[Parameter],
) -> Result<Vec<Row>, Error> {
    let mut rows = Vec::new();
    conn.query(sql, params, &mut |row| {
        rows.push(row);
        Ok(true)
    })?;

    Ok(rows)
}

/// Interpret a scalar `COUNT(*)` result.
pub(crate) fn scalar_count(value: Option<Value>) -> i64 {
    value.as_ref().and_then(i64::from_value).unwrap_or(0)
}
