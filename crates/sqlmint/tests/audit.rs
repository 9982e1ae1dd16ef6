mod common;

use common::{Customer, database};
use sqlmint::{
    Config,
    audit::{AuditRecord, Operation},
    command::ColumnChange,
    config::AuditLayout,
    prelude::*,
};

// Run one fixed workload and return the customer's history.
fn workload(mapper: &Mapper) -> Vec<AuditRecord> {
    let mut conn = database(mapper);
    let mut repo = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository");

    let mut customer = Customer {
        email: Some("ada@example.com".to_string()),
        ..Customer::named("Ada")
    };
    repo.add(&mut customer, None).expect("add");

    let old = customer.clone();
    customer.name = "Ada, Countess \"of\" Lovelace".to_string();
    customer.email = None;
    customer.updated_by = Some(4);
    repo.update(&mut customer, None, Some(&old)).expect("update");

    repo.delete(customer.id, None, 4).expect("delete");
    repo.recover(customer.id, None, 4).expect("recover");

    repo.read_history(customer.id).expect("history")
}

fn change<'a>(record: &'a AuditRecord, column: &str) -> Option<&'a ColumnChange> {
    record.changes.iter().find(|c| c.column == column)
}

#[test]
fn csv_trail_records_every_unit() {
    let history = workload(&Mapper::default());

    let ops: Vec<Operation> = history.iter().map(|r| r.operation).collect();
    assert_eq!(
        ops,
        [
            Operation::Insert,
            Operation::Update,
            Operation::Delete,
            Operation::Recover
        ]
    );

    let insert = &history[0];
    assert_eq!(insert.actor, Value::Int(1));
    assert_eq!(
        change(insert, "name").map(|c| (&c.old, &c.new)),
        Some((&Value::Null, &Value::from("Ada")))
    );
    assert!(change(insert, "version_no").is_some());

    let update = &history[1];
    assert_eq!(update.actor, Value::Int(4));
    assert_eq!(update.version, Some(2));
    assert_eq!(
        change(update, "name").map(|c| &c.new),
        Some(&Value::from("Ada, Countess \"of\" Lovelace"))
    );
    assert_eq!(
        change(update, "email").map(|c| (&c.old, &c.new)),
        Some((&Value::from("ada@example.com"), &Value::Null))
    );
    assert!(change(update, "credit_limit").is_none());

    let delete = &history[2];
    assert_eq!(delete.version, Some(3));
    assert_eq!(
        change(delete, "is_active").map(|c| (&c.old, &c.new)),
        Some((&Value::from("1"), &Value::from("0")))
    );
    assert!(history.iter().all(|r| r.recorded_on.is_some()));
}

#[test]
fn key_value_trail_matches_csv() {
    let config = Config::from_toml_str(
        r#"
        [audit]
        layout = "key_value"
        "#,
    )
    .expect("config");
    assert_eq!(config.audit.layout, AuditLayout::KeyValue);

    let csv = workload(&Mapper::default());
    let key_value = workload(&Mapper::new(config));

    let strip = |history: Vec<AuditRecord>| {
        history
            .into_iter()
            .map(|r| (r.operation, r.version, r.actor, r.changes))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(key_value), strip(csv));
}

#[test]
fn audit_tables_are_created_on_first_write() {
    let mapper = Mapper::default();
    let mut conn = database(&mapper);

    let mut repo = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository");
    assert!(
        !repo
            .db_object_exists("audit_trail", ObjectKind::Table, None)
            .expect("probe")
    );

    let mut customer = Customer::named("Barbara");
    repo.add(&mut customer, None).expect("add");

    assert!(
        repo.db_object_exists("audit_trail", ObjectKind::Table, None)
            .expect("probe")
    );
}
