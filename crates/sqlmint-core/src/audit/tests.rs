use crate::{
    audit::{AuditHeader, AuditStore, Operation, csv},
    command::ColumnChange,
    config::{AuditConfig, AuditLayout},
    connection::DialectKind,
    dialect::SqliteDialect,
    error::ErrorClass,
    test_fixtures::{RecordingConnection, row},
    value::Value,
};
use chrono::NaiveDate;
use proptest::prelude::*;

fn header(operation: Operation) -> AuditHeader {
    AuditHeader {
        table: "customer".to_string(),
        record_id: "42".to_string(),
        operation,
        version: Some(4),
        actor: Value::Int(9),
    }
}

fn key_value_store() -> AuditStore {
    AuditStore::new(&AuditConfig {
        layout: AuditLayout::KeyValue,
        ..AuditConfig::default()
    })
}

// ============================================================================
// CSV text
// ============================================================================

#[test]
fn csv_fields_escape_structural_characters() {
    assert_eq!(csv::field(None), "");
    assert_eq!(csv::field(Some("")), "\"\"");
    assert_eq!(csv::field(Some("plain")), "plain");
    assert_eq!(csv::field(Some("a,b")), "\"a,b\"");
    assert_eq!(csv::field(Some("say \"hi\"")), "\"say \"\"hi\"\"\"");
    assert_eq!(csv::field(Some("two\nlines")), "\"two\nlines\"");
}

#[test]
fn csv_keeps_null_and_empty_apart() {
    let changes = vec![
        ColumnChange::new("name", Value::from("Ada"), Value::from("")),
        ColumnChange::new("email", Value::Null, Value::from("x,y\r\nz")),
    ];

    let text = csv::encode_changes(&changes);
    assert_eq!(text, "name,Ada,\"\"\r\nemail,,\"x,y\r\nz\"");

    let decoded = csv::decode_changes(&text).expect("decode");
    assert_eq!(decoded, changes);
}

#[test]
fn csv_values_use_fixed_lexical_forms() {
    let stamp = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_milli_opt(10, 30, 0, 250))
        .expect("valid timestamp");
    let changes = vec![
        ColumnChange::new("is_active", Value::Bool(true), Value::Bool(false)),
        ColumnChange::new("updated_on", Value::Null, Value::DateTime(stamp)),
    ];

    assert_eq!(
        csv::encode_changes(&changes),
        "is_active,1,0\r\nupdated_on,,2024-05-01 10:30:00.250"
    );
}

#[test]
fn malformed_payloads_are_conversion_errors() {
    let short = csv::decode_changes("name,Ada").expect_err("two fields");
    assert_eq!(short.class, ErrorClass::Conversion);

    let open = csv::parse("\"never closed").expect_err("unterminated");
    assert_eq!(open.class, ErrorClass::Conversion);

    assert!(csv::decode_changes("").expect("empty").is_empty());
}

proptest! {
    #[test]
    fn csv_round_trips_any_text(
        column in "[a-z_]{1,16}",
        old in proptest::option::of(".*"),
        new in proptest::option::of("[\\PC\r\n\",]*"),
    ) {
        let change = ColumnChange::new(
            column,
            old.map_or(Value::Null, Value::Text),
            new.map_or(Value::Null, Value::Text),
        );

        let text = csv::encode_changes(std::slice::from_ref(&change));
        let decoded = csv::decode_changes(&text).expect("round trip");

        prop_assert_eq!(decoded, vec![change]);
    }
}

#[test]
fn operation_codes_round_trip() {
    for op in [
        Operation::Insert,
        Operation::Update,
        Operation::Delete,
        Operation::Recover,
    ] {
        assert_eq!(Operation::from_code(op.code()), Some(op));
    }
    assert_eq!(Operation::from_code("X"), None);
}

// ============================================================================
// Flush
// ============================================================================

#[test]
fn csv_unit_is_one_row() {
    let store = AuditStore::new(&AuditConfig::default());
    let mut conn = RecordingConnection::new(DialectKind::Sqlite);

    let mut unit = store.begin(header(Operation::Update));
    unit.append(ColumnChange::new("name", Value::from("Ada"), Value::from("Grace")));
    let written = unit.flush(&mut conn, &SqliteDialect).expect("flush");

    assert_eq!(written, 1);
    assert_eq!(
        conn.sql(),
        ["INSERT INTO audit_trail (table_name, record_id, operation, record_version, created_by, \
          created_on, changes) VALUES (@table_name, @record_id, @operation, @record_version, \
          @created_by, CURRENT_TIMESTAMP, @changes)"]
    );
    let params = conn.params(0);
    assert_eq!(params[2], ("operation", &Value::from("U")));
    assert_eq!(params[5], ("changes", &Value::from("name,Ada,Grace")));
}

#[test]
fn key_value_unit_writes_header_then_details() {
    let store = key_value_store();
    let mut conn = RecordingConnection::new(DialectKind::Sqlite);
    conn.scalars.push_back(Some(Value::Int(11)));

    let mut unit = store.begin(header(Operation::Delete));
    unit.extend([
        ColumnChange::new("is_active", Value::Bool(true), Value::Bool(false)),
        ColumnChange::new("version_no", Value::Int(3), Value::Int(4)),
    ]);
    let written = unit.flush(&mut conn, &SqliteDialect).expect("flush");

    assert_eq!(written, 2);
    let sql = conn.sql();
    assert_eq!(sql.len(), 4);
    assert!(!sql[0].contains("changes"));
    assert_eq!(sql[1], "SELECT last_insert_rowid()");
    assert!(sql[2].starts_with("INSERT INTO audit_trail_detail (audit_id, column_name"));

    let detail = conn.params(3);
    assert_eq!(detail[0], ("audit_id", &Value::Int(11)));
    assert_eq!(detail[1], ("column_name", &Value::from("version_no")));
    assert_eq!(detail[2], ("old_value", &Value::from("3")));
    assert_eq!(detail[3], ("new_value", &Value::from("4")));
}

#[test]
fn key_value_unit_without_header_id_fails() {
    let store = key_value_store();
    let mut conn = RecordingConnection::new(DialectKind::Sqlite);

    let err = store
        .begin(header(Operation::Insert))
        .flush(&mut conn, &SqliteDialect)
        .expect_err("no id");

    assert_eq!(err.class, ErrorClass::Conversion);
}

// ============================================================================
// Bootstrap and history
// ============================================================================

#[test]
fn audit_tables_are_probed_once_per_connection() {
    let store = key_value_store();
    let mut conn = RecordingConnection::new(DialectKind::Sqlite);
    conn.scalars.push_back(Some(Value::Int(0)));
    conn.scalars.push_back(Some(Value::Int(1)));

    store
        .ensure_audit_store(&mut conn, &SqliteDialect)
        .expect("ensure");
    store
        .ensure_audit_store(&mut conn, &SqliteDialect)
        .expect("ensure again");

    let sql = conn.sql();
    assert_eq!(sql.len(), 3);
    assert!(sql[0].contains("sqlite_master"));
    assert!(sql[1].starts_with("CREATE TABLE audit_trail ("));
    assert!(sql[2].contains("sqlite_master"));

    store.reset();
    store
        .ensure_audit_store(&mut conn, &SqliteDialect)
        .expect("ensure after reset");
    assert!(conn.statements.len() > 3);
}

#[test]
fn csv_history_decodes_rows() {
    let store = AuditStore::new(&AuditConfig::default());
    let mut conn = RecordingConnection::new(DialectKind::Sqlite);
    conn.results.push_back(vec![row(&[
        ("id", Value::Int(1)),
        ("operation", Value::from("U")),
        ("record_version", Value::Int(4)),
        ("created_by", Value::Int(9)),
        ("created_on", Value::from("2024-05-01 10:00:00")),
        ("changes", Value::from("name,Ada,Grace")),
    ])]);

    let history = store
        .read_history(&mut conn, "customer", "42")
        .expect("history");

    assert_eq!(history.len(), 1);
    let record = &history[0];
    assert_eq!(record.operation, Operation::Update);
    assert_eq!(record.version, Some(4));
    assert_eq!(record.actor, Value::Int(9));
    assert_eq!(
        record.recorded_on,
        NaiveDate::from_ymd_opt(2024, 5, 1).and_then(|d| d.and_hms_opt(10, 0, 0))
    );
    assert_eq!(
        record.changes,
        vec![ColumnChange::new("name", Value::from("Ada"), Value::from("Grace"))]
    );
}

#[test]
fn key_value_history_reads_details_per_header() {
    let store = key_value_store();
    let mut conn = RecordingConnection::new(DialectKind::Sqlite);
    conn.results.push_back(vec![row(&[
        ("id", Value::Int(5)),
        ("operation", Value::from("R")),
        ("record_version", Value::Int(6)),
        ("created_by", Value::Int(9)),
        ("created_on", Value::Null),
    ])]);
    conn.results.push_back(vec![row(&[
        ("column_name", Value::from("is_active")),
        ("old_value", Value::from("0")),
        ("new_value", Value::from("1")),
    ])]);

    let history = store
        .read_history(&mut conn, "customer", "42")
        .expect("history");

    assert_eq!(history[0].operation, Operation::Recover);
    assert_eq!(
        history[0].changes,
        vec![ColumnChange::new("is_active", Value::from("0"), Value::from("1"))]
    );
    assert_eq!(conn.params(1), [("audit_id", &Value::Int(5))]);
}
