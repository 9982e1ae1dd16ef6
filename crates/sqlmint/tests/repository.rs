mod common;

use chrono::NaiveDate;
use common::{Customer, Order, SqliteConnection, Tag, database, seed};
use sqlmint::{audit::Operation, error::ErrorClass, prelude::*};

fn stored(mapper: &Mapper, conn: &mut SqliteConnection, id: i64) -> Customer {
    mapper
        .repository::<Customer, _>(conn)
        .expect("repository")
        .read_one(id, None)
        .expect("read")
        .expect("row exists")
}

#[test]
fn insert_update_twice_then_stale_delete() {
    let mapper = Mapper::default();
    let mut conn = database(&mapper);
    let mut repo = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository");

    let mut customer = Customer::named("Ada");
    let id = repo.add(&mut customer, None).expect("add");
    assert_eq!(id, Some(Value::Int(customer.id)));
    assert_eq!(customer.version_no, 1);

    customer.updated_by = Some(2);
    for name in ["Ada L.", "Ada Lovelace"] {
        let old = customer.clone();
        customer.name = name.to_string();
        assert!(repo.update(&mut customer, None, Some(&old)).expect("update"));
    }
    assert_eq!(customer.version_no, 3);

    let err = repo
        .delete(customer.id, Some(1), 2)
        .expect_err("version 1 is stale");
    assert_eq!(err.class, ErrorClass::Concurrency);

    let history = repo.read_history(customer.id).expect("history");
    let ops: Vec<Operation> = history.iter().map(|r| r.operation).collect();
    assert_eq!(ops, [Operation::Insert, Operation::Update, Operation::Update]);
    assert_eq!(
        history.iter().map(|r| r.version).collect::<Vec<_>>(),
        [Some(1), Some(2), Some(3)]
    );

    let row = repo
        .read_one(customer.id, None)
        .expect("read")
        .expect("still there");
    assert_eq!(row.name, "Ada Lovelace");
    assert_eq!(row.version_no, 3);
    assert!(row.is_active);
}

#[test]
fn every_mutation_bumps_the_version_once() {
    let mapper = Mapper::default();
    let mut conn = database(&mapper);
    let id = seed(&mapper, &mut conn, &["Grace"])[0].id;

    let mut customer = stored(&mapper, &mut conn, id);
    assert_eq!(customer.version_no, 1);

    {
        let mut repo = mapper
            .repository::<Customer, _>(&mut conn)
            .expect("repository");

        customer.updated_by = Some(3);
        customer.email = Some("grace@example.com".to_string());
        repo.update(&mut customer, None, None).expect("update");
        repo.delete(id, None, 3).expect("delete");
        repo.recover(id, None, 3).expect("recover");
    }

    let customer = stored(&mapper, &mut conn, id);
    assert_eq!(customer.version_no, 4);
    assert_eq!(customer.email.as_deref(), Some("grace@example.com"));
    assert_eq!(customer.updated_by, Some(3));
    assert!(customer.updated_on.is_some());
}

#[test]
fn unchanged_update_leaves_no_trace() {
    let mapper = Mapper::default();
    let mut conn = database(&mapper);
    let id = seed(&mapper, &mut conn, &["Edsger"])[0].id;

    let mut repo = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository");
    let old = repo.read_one(id, None).expect("read").expect("row");
    let mut customer = old.clone();

    assert!(!repo.update(&mut customer, None, Some(&old)).expect("update"));
    assert_eq!(customer.version_no, 1);
    assert_eq!(repo.read_history(id).expect("history").len(), 1);
}

#[test]
fn soft_delete_and_recover_round_trip() {
    let mapper = Mapper::default();
    let mut conn = database(&mapper);
    let ids: Vec<i64> = seed(&mapper, &mut conn, &["Alan", "Barbara", "Claude"])
        .iter()
        .map(|c| c.id)
        .collect();

    let mut repo = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository");
    assert!(repo.delete(ids[1], None, 5).expect("delete"));

    assert_eq!(repo.count(&ReadQuery::new()).expect("count"), 2);
    let inactive = repo
        .read_all(&ReadQuery::new().status(Status::InActive))
        .expect("read");
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].name, "Barbara");
    assert!(repo.exists(ids[1]).expect("exists"));

    assert!(repo.recover(ids[1], None, 5).expect("recover"));
    let all = repo
        .read_all(&ReadQuery::new().order_by("name"))
        .expect("read");
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].version_no, 3);

    let ops: Vec<Operation> = repo
        .read_history(ids[1])
        .expect("history")
        .iter()
        .map(|r| r.operation)
        .collect();
    assert_eq!(ops, [Operation::Insert, Operation::Delete, Operation::Recover]);
}

#[test]
fn delete_and_recover_through_the_entity() {
    let mapper = Mapper::default();
    let mut conn = database(&mapper);
    let mut customer = seed(&mapper, &mut conn, &["Ada"]).remove(0);

    let mut repo = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository");
    assert!(repo.delete(&mut customer, None, 2).expect("delete"));
    assert_eq!(customer.version_no, 2);
    assert!(!customer.is_active);

    // the entity carries the new version, so recover is not stale
    assert!(repo.recover(&mut customer, None, 2).expect("recover"));
    assert_eq!(customer.version_no, 3);
    assert!(customer.is_active);

    let row = repo
        .read_one(customer.id, None)
        .expect("read")
        .expect("row");
    assert_eq!(row.version_no, 3);
    assert!(row.is_active);
}

#[test]
fn update_without_snapshot_refreshes_the_stamp() {
    let mapper = Mapper::default();
    let mut conn = database(&mapper);
    let id = seed(&mapper, &mut conn, &["Ada"])[0].id;
    let stale = NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date");

    let mut repo = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository");
    let old = repo.read_one(id, None).expect("read").expect("row");
    let mut backdated = Customer {
        email: Some("ada@example.com".to_string()),
        updated_by: Some(2),
        updated_on: Some(stale),
        ..old.clone()
    };
    repo.update(&mut backdated, None, Some(&old)).expect("backdate");

    let mut row = repo.read_one(id, None).expect("read").expect("row");
    assert_eq!(row.updated_on, Some(stale));

    row.name = "Ada L.".to_string();
    assert!(repo.update(&mut row, None, None).expect("update"));

    let row = repo.read_one(id, None).expect("read").expect("row");
    assert_eq!(row.name, "Ada L.");
    assert!(row.updated_on.is_some_and(|stamp| stamp > stale));
}

#[test]
fn active_reference_blocks_delete() {
    let mapper = Mapper::default();
    let mut conn = database(&mapper);
    let customer_id = seed(&mapper, &mut conn, &["Donald"])[0].id;

    let mut order = Order {
        customer_id,
        reference: "PO-1".to_string(),
        created_by: Some(1),
        ..Order::default()
    };
    mapper
        .repository::<Order, _>(&mut conn)
        .expect("repository")
        .add(&mut order, None)
        .expect("add order");

    let err = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository")
        .delete(customer_id, None, 1)
        .expect_err("order still active");
    assert_eq!(err.class, ErrorClass::ReferentialIntegrity);
    assert!(err.to_string().contains("orders"));
    assert!(stored(&mapper, &mut conn, customer_id).is_active);

    // a soft-deleted order no longer counts
    mapper
        .repository::<Order, _>(&mut conn)
        .expect("repository")
        .delete(order.id, None, Value::Null)
        .expect("delete order");
    assert!(
        mapper
            .repository::<Customer, _>(&mut conn)
            .expect("repository")
            .delete(customer_id, None, 1)
            .expect("delete customer")
    );
}

#[test]
fn generated_keys_are_returned() {
    let mapper = Mapper::default();
    let mut conn = SqliteConnection::temporary();
    let mut repo = mapper.repository::<Tag, _>(&mut conn).expect("repository");
    repo.create_table().expect("create");
    assert!(repo.is_table_exists().expect("probe"));

    let mut tag = Tag {
        name: "rust".to_string(),
        ..Tag::default()
    };
    let key = repo.add(&mut tag, None).expect("add");

    assert!(!tag.id.is_nil());
    assert_eq!(key, Some(Value::Ulid(tag.id)));
    assert_eq!(
        repo.read_one(tag.id, None).expect("read").map(|t| t.name),
        Some("rust".to_string())
    );
}

#[test]
fn offset_pages_follow_the_order() {
    let mapper = Mapper::default();
    let mut conn = database(&mapper);
    seed(&mapper, &mut conn, &["e", "b", "d", "a", "c"]);

    let mut repo = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository");
    let query = ReadQuery::new().order_by("name");
    let names = |page: Vec<Customer>| page.into_iter().map(|c| c.name).collect::<Vec<_>>();

    assert_eq!(names(repo.read_all_paged(&query, 1, 2).expect("page 1")), ["a", "b"]);
    assert_eq!(names(repo.read_all_paged(&query, 3, 2).expect("page 3")), ["e"]);

    let err = repo.read_all_paged(&query, 0, 2).expect_err("page 0");
    assert_eq!(err.class, ErrorClass::Configuration);
}

#[test]
fn filtered_reads_bind_parameters() {
    let mapper = Mapper::default().debug();
    let mut conn = database(&mapper);
    seed(&mapper, &mut conn, &["Ken", "Dennis", "Brian"]);

    let mut repo = mapper
        .repository::<Customer, _>(&mut conn)
        .expect("repository");
    let query = ReadQuery::new()
        .filter("name <> @skip")
        .param("skip", "Ken")
        .order_by("name DESC");

    let found = repo.read_one_where(&query).expect("read").expect("row");
    assert_eq!(found.name, "Dennis");
    assert_eq!(repo.count(&query).expect("count"), 2);

    let raw = repo
        .read_all_query(
            "SELECT id, name FROM customer WHERE name LIKE @prefix",
            &[Parameter::from_value("prefix", "B%")],
        )
        .expect("raw");
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].name, "Brian");
    assert_eq!(raw[0].version_no, 0);
}
