use crate::{
    config::{Config, DialectConfig},
    connection::{ConnectionSignature, DialectKind},
    dialect::{
        Dialect, DialectRegistry, IdentityFetch, PostgresDialect, SelectParts, SqlServerDialect,
        SqliteDialect,
    },
    error::ErrorClass,
    model::{ColumnModel, EntityModel, IgnoreFlags, TableName},
    test_fixtures::{Customer, OrderLine},
    traits::EntityKind,
    types::{DbType, ObjectKind},
};
use std::sync::Arc;

fn plan<E: EntityKind>() -> EntityModel {
    EntityModel::build(E::DECLARATION, &Config::default()).expect("plan should build")
}

fn parts() -> SelectParts {
    SelectParts::new("id, name", "customer")
        .filter(Some("is_active = 1".to_string()))
        .order_by("name ASC")
}

fn key_column(name: &'static str, identity: bool) -> ColumnModel {
    ColumnModel {
        field: name,
        name: name.to_string(),
        db_type: DbType::Int64,
        size: None,
        precision: None,
        scale: None,
        nullable: false,
        primary_key: true,
        identity,
        ignore: IgnoreFlags::default(),
        reserved: None,
    }
}

// ============================================================================
// Fragments and DDL
// ============================================================================

#[test]
fn sql_server_fragments_and_identity_ddl() {
    let dialect = SqlServerDialect::default();

    assert_eq!(dialect.bool_literal(true), "1");
    assert_eq!(dialect.current_timestamp(), "GETDATE()");
    assert!(matches!(dialect.identity_fetch(), IdentityFetch::Batched(_)));

    let ddl = dialect.create_table(&plan::<Customer>());
    assert_eq!(ddl.len(), 1);

    let sql = &ddl[0];
    assert!(sql.starts_with("CREATE TABLE customer (id BIGINT IDENTITY(1,1) NOT NULL, "));
    assert!(sql.contains("name NVARCHAR(100) NOT NULL"));
    assert!(sql.contains("email NVARCHAR(255) NULL"));
    assert!(sql.contains("credit_limit DECIMAL(18, 2) NOT NULL"));
    assert!(sql.contains("created_on DATETIME2 NULL DEFAULT GETDATE()"));
    assert!(sql.contains("version_no INT NOT NULL DEFAULT 1"));
    assert!(sql.contains("is_active BIT NOT NULL DEFAULT 1"));
    assert!(sql.ends_with("PRIMARY KEY (id))"));
}

#[test]
fn postgres_uses_serial_and_separate_identity_fetch() {
    let dialect = PostgresDialect;

    assert_eq!(dialect.bool_literal(false), "false");
    assert_eq!(
        dialect.identity_fetch(),
        IdentityFetch::Separate("SELECT lastval()")
    );

    let sql = &dialect.create_table(&plan::<Customer>())[0];
    assert!(sql.contains("id BIGSERIAL NOT NULL"));
    assert!(sql.contains("is_active BOOLEAN NOT NULL DEFAULT true"));
    assert!(sql.contains("credit_limit NUMERIC(18, 2) NOT NULL"));
}

#[test]
fn sqlite_identity_key_is_declared_inline() {
    let ddl = SqliteDialect.create_table(&plan::<Customer>());

    assert_eq!(ddl.len(), 1);
    assert!(ddl[0].contains("id INTEGER PRIMARY KEY AUTOINCREMENT, "));
    assert!(!ddl[0].contains("PRIMARY KEY ("));
    assert!(ddl[0].contains("credit_limit TEXT NOT NULL"));
}

#[test]
fn sqlite_composite_key_with_identity_gets_unique_index() {
    let model = EntityModel::synthetic(
        "Line",
        TableName::new(None, "line"),
        vec![key_column("line_id", true), key_column("order_id", false)],
    );

    let ddl = SqliteDialect.create_table(&model);

    assert_eq!(
        ddl,
        vec![
            "CREATE TABLE line (line_id INTEGER PRIMARY KEY AUTOINCREMENT, order_id INTEGER NOT NULL)"
                .to_string(),
            "CREATE UNIQUE INDEX ux_line_key ON line (line_id, order_id)".to_string(),
        ]
    );
}

#[test]
fn composite_key_without_identity_uses_table_constraint() {
    let ddl = SqliteDialect.create_table(&plan::<OrderLine>());

    assert_eq!(ddl.len(), 1);
    assert!(ddl[0].ends_with("PRIMARY KEY (order_id, line_no))"));
    assert!(!ddl[0].contains("is_active"));
}

#[test]
fn sqlite_index_is_schema_qualified_not_the_table() {
    let table = TableName::new(Some("meta"), "tag");

    assert_eq!(
        SqliteDialect.create_index(&table, "ix_tag_slug", &["slug"], false),
        "CREATE INDEX meta.ix_tag_slug ON tag (slug)"
    );
    assert_eq!(
        PostgresDialect.create_index(&table, "ix_tag_slug", &["slug"], true),
        "CREATE UNIQUE INDEX ix_tag_slug ON meta.tag (slug)"
    );
}

// ============================================================================
// Row bounding
// ============================================================================

#[test]
fn offset_paging_per_dialect() {
    assert_eq!(
        SqlServerDialect::default().select_page(&parts(), 20, 10),
        "SELECT id, name FROM customer WHERE is_active = 1 ORDER BY name ASC \
         OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
    );
    assert_eq!(
        PostgresDialect.select_page(&parts(), 20, 10),
        "SELECT id, name FROM customer WHERE is_active = 1 ORDER BY name ASC LIMIT 10 OFFSET 20"
    );
}

#[test]
fn legacy_sql_server_pages_with_row_number() {
    let sql = SqlServerDialect::new(10).select_page(&parts(), 20, 10);

    assert_eq!(
        sql,
        "SELECT * FROM (SELECT id, name, ROW_NUMBER() OVER (ORDER BY name ASC) AS row_num \
         FROM customer WHERE is_active = 1) AS paged WHERE row_num BETWEEN 21 AND 30 ORDER BY row_num"
    );
}

#[test]
fn top_and_exists_shapes() {
    assert_eq!(
        SqlServerDialect::default().select_top(&parts(), 5),
        "SELECT TOP (5) id, name FROM customer WHERE is_active = 1 ORDER BY name ASC"
    );
    assert_eq!(
        SqliteDialect.select_top(&parts(), 5),
        "SELECT id, name FROM customer WHERE is_active = 1 ORDER BY name ASC LIMIT 5"
    );
    assert_eq!(
        SqlServerDialect::default().select_exists("orders", "customer_id = @key"),
        "SELECT TOP 1 1 FROM orders WHERE customer_id = @key"
    );
    assert_eq!(
        SqliteDialect.wrap_reorder("SELECT id FROM t ORDER BY id DESC LIMIT 2", "id ASC"),
        "SELECT * FROM (SELECT id FROM t ORDER BY id DESC LIMIT 2) AS page ORDER BY id ASC"
    );
}

// ============================================================================
// Catalog probes
// ============================================================================

#[test]
fn object_probe_binds_name_and_schema() {
    let probe = SqlServerDialect::default()
        .object_exists("customer", ObjectKind::Table, Some("sales"))
        .expect("table probe");

    assert!(probe.sql.ends_with("TABLE_NAME = @name AND TABLE_SCHEMA = @schema"));
    let names: Vec<&str> = probe.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["name", "schema"]);
}

#[test]
fn sqlite_routine_probes_are_unsupported() {
    let err = SqliteDialect
        .object_exists("f", ObjectKind::Function, None)
        .expect_err("sqlite has no functions");
    assert_eq!(err.class, ErrorClass::Unsupported);

    let probe = SqliteDialect
        .object_exists("tag", ObjectKind::Table, Some("meta"))
        .expect("table probe");
    assert_eq!(
        probe.sql,
        "SELECT COUNT(*) FROM meta.sqlite_master WHERE type = 'table' AND name = @name"
    );
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn registry_shares_one_dialect_per_signature() {
    let registry = DialectRegistry::new();
    let config = DialectConfig::default();
    let a = ConnectionSignature::new(DialectKind::Postgres, "host=a");
    let b = ConnectionSignature::new(DialectKind::Postgres, "host=b");

    let first = registry.get(&a, &config);
    let again = registry.get(&a, &config);
    let other = registry.get(&b, &config);

    assert!(Arc::ptr_eq(&first, &again));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(registry.len(), 2);
    assert_eq!(first.kind(), DialectKind::Postgres);

    registry.clear();
    assert!(registry.is_empty());
}

#[test]
fn registry_applies_configured_server_version() {
    let registry = DialectRegistry::new();
    let config = DialectConfig {
        sql_server_major_version: 10,
    };
    let dialect = registry.get(
        &ConnectionSignature::new(DialectKind::SqlServer, "Server=legacy"),
        &config,
    );

    assert!(dialect.select_page(&parts(), 0, 10).contains("ROW_NUMBER()"));
}
