//! Repository.
//!
//! Public surface over one record type and one borrowed connection. Each call
//! resolves the mapping plan, has the command builder assemble the statement,
//! runs it, and brackets audited mutations in a transaction.
//!
//! Connection ownership: a closed connection is opened for the call and
//! closed again afterwards; an open one is left open. A transaction is begun
//! only when history is needed and none is active, and only that transaction
//! is committed or rolled back here.

mod query;


pub use query::ReadQuery;

use crate::{
    audit::{AuditHeader, AuditRecord, Operation, scalar_count},
    command::{
        ColumnChange, Command, DeleteCommand, DeleteMode, InsertCommand, Key, UpdateCommand,
        build_delete, build_insert, build_reference_probe, build_select_by_key, build_update,
        key_predicate, key_text, resolve_key,
    },
    connection::{Connection, Parameter, Row},
    dialect::{Dialect, SelectParts},
    error::{Error, ErrorOrigin},
    mapper::Mapper,
    model::{ColumnModel, EntityModel, ReservedColumn, VirtualForeignKey},
    obs::sink::{self, ExecKind, MetricsEvent, Span},
    paging::{KeysetCursor, Navigation, OrderTerm, page_bounds, parse_order_by, plan_keyset},
    traits::{EntityKind, FieldValue},
    types::ObjectKind,
    value::Value,
};
use std::{marker::PhantomData, sync::Arc};

///
/// Repository
///
/// Single-call-at-a-time handle for `E` over a borrowed connection.
///

pub struct Repository<'a, E, C: ?Sized> {
    mapper: &'a Mapper,
    conn: &'a mut C,
    model: Arc<EntityModel>,
    dialect: Arc<dyn Dialect>,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E, C> Repository<'a, E, C>
where
    E: EntityKind,
    C: Connection + ?Sized,
{
    pub(crate) fn new(mapper: &'a Mapper, conn: &'a mut C) -> Result<Self, Error> {
        let model = mapper.plan::<E>()?;
        let dialect = mapper.dialect(&conn.signature());

        Ok(Self {
            mapper,
            conn,
            model,
            dialect,
            _entity: PhantomData,
        })
    }

    #[must_use]
    pub fn model(&self) -> &EntityModel {
        &self.model
    }

    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    // ======================================================================
    // Mutations
    // ======================================================================

    /// Insert `entity`. Returns the generated key: the database identity, or
    /// a freshly generated 128-bit key. Identity and version are written back
    /// into the entity.
    pub fn add(&mut self, entity: &mut E, columns: Option<&[&str]>) -> Result<Option<Value>, Error> {
        let model = Arc::clone(&self.model);
        let mut span = Span::new(ExecKind::Insert, model.type_name);
        let history = model.features.needs_history;

        let before = model.key_values(entity)?;
        let InsertCommand {
            command,
            changes,
            version,
        } = build_insert(&model, &*self.dialect, entity, columns)?;

        let identity = self.with_transaction(history, |repo| {
            let (rows, id) = repo.run(ExecKind::Insert, &command)?;
            span.set_rows(rows);

            let id = id.filter(|v| !v.is_null());
            if let (Some(column), Some(id)) = (model.identity_column(), &id) {
                column.write(entity, id)?;
            }

            if history {
                let actor = match model.reserved(ReservedColumn::CreatedBy) {
                    Some(column) => column.read(entity)?,
                    None => Value::Null,
                };
                let header = AuditHeader {
                    table: model.table.to_string(),
                    record_id: key_text(&model.key_values(entity)?),
                    operation: Operation::Insert,
                    version,
                    actor,
                };
                repo.write_audit(header, changes)?;
            }

            Ok(id)
        })?;

        if let (Some(column), Some(version)) = (model.reserved(ReservedColumn::VersionNo), version) {
            column.write(entity, &Value::Int(version))?;
        }
        if let Some(column) = model.reserved(ReservedColumn::IsActive)
            && !column.ignore.insert
        {
            column.write(entity, &Value::Bool(true))?;
        }

        if identity.is_some() || model.has_composite_key() {
            return Ok(identity);
        }
        let after = model.key_values(entity)?;

        Ok((after != before).then(|| after.into_iter().next()).flatten())
    }

    /// Update `entity`. With an `old` snapshot only changed columns are
    /// written; when nothing changed no statement runs and `false` is
    /// returned. The in-memory version is bumped on success.
    pub fn update(
        &mut self,
        entity: &mut E,
        columns: Option<&[&str]>,
        old: Option<&E>,
    ) -> Result<bool, Error> {
        let model = Arc::clone(&self.model);
        let mut span = Span::new(ExecKind::Update, model.type_name);
        let history = model.features.needs_history;

        self.fill_version(entity)?;

        let UpdateCommand {
            command,
            changes,
            is_update_needed,
            version,
        } = build_update(
            &model,
            &*self.dialect,
            entity,
            old,
            columns,
            self.mapper.config().concurrency_check,
        )?;

        if !is_update_needed {
            tracing::debug!(
                entity = model.type_name,
                table = %model.table,
                "update skipped, no column changed"
            );
            return Ok(false);
        }

        let key = model.key_values(entity)?;

        self.with_transaction(history, |repo| {
            let (rows, _) = repo.run(ExecKind::Update, &command)?;
            span.set_rows(rows);
            if rows == 0 {
                return Err(repo.conflict(&key));
            }

            if history {
                let actor = match model.reserved(ReservedColumn::UpdatedBy) {
                    Some(column) => column.read(entity)?,
                    None => Value::Null,
                };
                let header = AuditHeader {
                    table: model.table.to_string(),
                    record_id: key_text(&key),
                    operation: Operation::Update,
                    version: version.map(|v| v + 1),
                    actor,
                };
                repo.write_audit(header, changes)?;
            }

            Ok(())
        })?;

        if let (Some(column), Some(version)) = (model.reserved(ReservedColumn::VersionNo), version) {
            column.write(entity, &Value::Int(version + 1))?;
        }

        Ok(true)
    }

    /// Delete one record: soft when the type carries is-active, hard
    /// otherwise. `version` is read from the database when not supplied and
    /// the concurrency check or history needs it. Passing `&mut entity`
    /// writes the bumped version and is-active flag back.
    pub fn delete<'k>(
        &mut self,
        key: impl Into<Key<'k, E>>,
        version: Option<i64>,
        updated_by: impl Into<Value>,
    ) -> Result<bool, Error> {
        let mode = if self.model.features.is_active {
            DeleteMode::Soft
        } else {
            DeleteMode::Hard
        };

        self.remove(key.into(), version, updated_by.into(), mode)
    }

    /// Remove the row regardless of is-active.
    pub fn hard_delete<'k>(
        &mut self,
        key: impl Into<Key<'k, E>>,
        version: Option<i64>,
        updated_by: impl Into<Value>,
    ) -> Result<bool, Error> {
        self.remove(key.into(), version, updated_by.into(), DeleteMode::Hard)
    }

    /// Undo a soft delete.
    pub fn recover<'k>(
        &mut self,
        key: impl Into<Key<'k, E>>,
        version: Option<i64>,
        updated_by: impl Into<Value>,
    ) -> Result<bool, Error> {
        self.remove(key.into(), version, updated_by.into(), DeleteMode::Recover)
    }

    fn remove(
        &mut self,
        key: Key<'_, E>,
        version: Option<i64>,
        updated_by: Value,
        mode: DeleteMode,
    ) -> Result<bool, Error> {
        let model = Arc::clone(&self.model);
        let kind = match mode {
            DeleteMode::Soft => ExecKind::Delete,
            DeleteMode::Hard => ExecKind::HardDelete,
            DeleteMode::Recover => ExecKind::Recover,
        };
        let mut span = Span::new(kind, model.type_name);
        let history = model.features.needs_history;
        let check = self.mapper.config().concurrency_check;

        if mode == DeleteMode::Recover && !model.features.is_active {
            return Err(Error::unsupported(
                ErrorOrigin::Repository,
                format!("{} has no is-active column; recover is unavailable", model.type_name),
            ));
        }
        if history && updated_by.is_null() {
            return Err(Error::required_field(
                ErrorOrigin::Repository,
                &model.table.to_string(),
                ReservedColumn::UpdatedBy.field_name(),
            ));
        }

        let key_values = resolve_key(&model, &key)?;
        let supplied = match (version.filter(|v| *v != 0), key.entity()) {
            (Some(version), _) => Some(version),
            (None, Some(entity)) => match model.reserved(ReservedColumn::VersionNo) {
                Some(column) => column.read(entity)?.as_i64().filter(|v| *v != 0),
                None => None,
            },
            (None, None) => None,
        };

        let version = self.with_connection(|repo| {
            if mode != DeleteMode::Recover {
                repo.check_references(&key, &key_values)?;
            }

            // the stored version is only needed to compare or to audit
            let version = match supplied {
                Some(version) => Some(version),
                None if model.features.version_no && (check || history) => Some(
                    repo.current_version(&key_values)?
                        .ok_or_else(|| repo.conflict(&key_values))?,
                ),
                None => None,
            };

            let DeleteCommand { command, changes } = build_delete(
                &model,
                &*repo.dialect,
                &key_values,
                version,
                &updated_by,
                mode,
                check,
            )?;

            repo.with_transaction(history, |repo| {
                let (rows, _) = repo.run(kind, &command)?;
                span.set_rows(rows);
                if rows == 0 {
                    return Err(repo.conflict(&key_values));
                }

                if history {
                    let header = AuditHeader {
                        table: model.table.to_string(),
                        record_id: key_text(&key_values),
                        operation: mode.operation(),
                        version: match mode {
                            DeleteMode::Hard => version,
                            DeleteMode::Soft | DeleteMode::Recover => version.map(|v| v + 1),
                        },
                        actor: updated_by.clone(),
                    };
                    repo.write_audit(header, changes)?;
                }

                Ok(version)
            })
        })?;

        if let Key::EntityMut(entity) = key
            && mode != DeleteMode::Hard
        {
            if let (Some(column), Some(version)) =
                (model.reserved(ReservedColumn::VersionNo), version)
            {
                column.write(entity, &Value::Int(version + 1))?;
            }
            if let Some(column) = model.reserved(ReservedColumn::IsActive) {
                column.write(entity, &Value::Bool(mode == DeleteMode::Recover))?;
            }
        }

        Ok(true)
    }

    // ======================================================================
    // Reads
    // ======================================================================

    /// Whether a row with this key exists, regardless of is-active.
    pub fn exists<'k>(&mut self, key: impl Into<Key<'k, E>>) -> Result<bool, Error> {
        let key_values = resolve_key(&self.model, &key.into())?;
        let (predicate, params) = key_predicate(&self.model, &key_values)?;

        self.exists_where(&predicate, &params)
    }

    /// Whether any row matches `filter`.
    pub fn exists_where(&mut self, filter: &str, params: &[Parameter]) -> Result<bool, Error> {
        let _span = Span::new(ExecKind::Exists, self.model.type_name);
        let sql = self
            .dialect
            .select_exists(&self.model.table.to_string(), filter);

        let found = self.with_connection(|repo| repo.scalar(ExecKind::Exists, &sql, params))?;

        Ok(found.is_some_and(|v| !v.is_null()))
    }

    pub fn count(&mut self, query: &ReadQuery) -> Result<i64, Error> {
        let mut span = Span::new(ExecKind::Count, self.model.type_name);
        let (from, filter) = self.source(query);
        let sql = match filter {
            Some(filter) => format!("SELECT COUNT(*) FROM {from} WHERE {filter}"),
            None => format!("SELECT COUNT(*) FROM {from}"),
        };

        let count = self.with_connection(|repo| repo.scalar(ExecKind::Count, &sql, &query.params))?;
        let count = scalar_count(count);
        span.set_rows(u64::try_from(count).unwrap_or_default());

        Ok(count)
    }

    /// One record by key, regardless of is-active.
    pub fn read_one<'k>(
        &mut self,
        key: impl Into<Key<'k, E>>,
        columns: Option<&[&str]>,
    ) -> Result<Option<E>, Error> {
        let key_values = resolve_key(&self.model, &key.into())?;
        let selected: Vec<&ColumnModel> = match columns {
            Some(names) => self.model.resolve_columns(names)?,
            None => self.model.read_columns().collect(),
        };
        let command = build_select_by_key(&self.model, &selected, &key_values)?;

        self.first(&command.sql, &command.params)
    }

    /// First record matching the query.
    pub fn read_one_where(&mut self, query: &ReadQuery) -> Result<Option<E>, Error> {
        let (parts, params) = self.select_parts(query, &[])?;
        let sql = match &query.order_by {
            Some(order_by) => self.dialect.select_top(&parts.order_by(order_by.as_str()), 1),
            None => self.dialect.select_top(&parts, 1),
        };

        self.first(&sql, &params)
    }

    pub fn read_all(&mut self, query: &ReadQuery) -> Result<Vec<E>, Error> {
        let mut entities = Vec::new();
        self.for_each(query, |entity| {
            entities.push(entity);
            Ok(true)
        })?;

        Ok(entities)
    }

    /// Stream matching records into `f`, which returns `false` to stop.
    /// Returns the number of rows delivered.
    pub fn for_each(
        &mut self,
        query: &ReadQuery,
        mut f: impl FnMut(E) -> Result<bool, Error>,
    ) -> Result<u64, Error> {
        let (parts, params) = self.select_parts(query, &[])?;
        let sql = match &query.order_by {
            Some(order_by) => parts.order_by(order_by.as_str()).render(),
            None => parts.render(),
        };

        self.stream_all(&sql, &params, &mut f)
    }

    /// Records produced by a caller-written statement.
    pub fn read_all_query(&mut self, sql: &str, params: &[Parameter]) -> Result<Vec<E>, Error> {
        let mut entities = Vec::new();
        self.stream_all(sql, params, &mut |entity| {
            entities.push(entity);
            Ok(true)
        })?;

        Ok(entities)
    }

    /// Audit units recorded for one record, oldest first.
    pub fn read_history<'k>(&mut self, key: impl Into<Key<'k, E>>) -> Result<Vec<AuditRecord>, Error> {
        let key_values = resolve_key(&self.model, &key.into())?;
        let record_id = key_text(&key_values);
        let table = self.model.table.to_string();
        let mapper = self.mapper;
        let dialect = Arc::clone(&self.dialect);

        self.with_connection(|repo| {
            mapper.audit().ensure_audit_store(&mut *repo.conn, &*dialect)?;
            mapper.audit().read_history(&mut *repo.conn, &table, &record_id)
        })
    }

    // ======================================================================
    // Paging
    // ======================================================================

    /// Offset paging; `page_no` is 1-based and the query must be ordered.
    pub fn read_all_paged(
        &mut self,
        query: &ReadQuery,
        page_no: u64,
        page_size: u64,
    ) -> Result<Vec<E>, Error> {
        let order_by = required_order(query)?;
        let (offset, limit) = page_bounds(page_no, page_size)?;
        let (parts, params) = self.select_parts(query, &[])?;
        let sql = self
            .dialect
            .select_page(&parts.order_by(order_by), offset, limit);

        self.read_all_query(&sql, &params)
    }

    /// Keyset paging. `cursor` is the boundary row of the current page and
    /// is required for Next and Previous.
    pub fn read_all_keyset(
        &mut self,
        query: &ReadQuery,
        page_size: u64,
        navigation: Navigation,
        cursor: Option<&KeysetCursor>,
    ) -> Result<Vec<E>, Error> {
        if page_size == 0 {
            return Err(Error::configuration(
                ErrorOrigin::Paging,
                "page size must be positive",
            ));
        }

        let order = self.physical_order(parse_order_by(required_order(query)?)?);
        let plan = plan_keyset(&self.model, &order, navigation, cursor)?;

        let mut anchors: Vec<String> = order.iter().map(|t| t.column.clone()).collect();
        anchors.extend(self.model.primary_keys().map(|c| c.name.clone()));
        let anchors: Vec<&str> = anchors.iter().map(String::as_str).collect();

        let (mut parts, mut params) = self.select_parts(query, &anchors)?;
        if let Some(predicate) = plan.predicate {
            parts.filter = Some(match parts.filter.take() {
                Some(filter) => format!("{filter} AND {predicate}"),
                None => predicate,
            });
        }
        params.extend(plan.params);

        let inner = self
            .dialect
            .select_top(&parts.order_by(plan.exec_order), page_size);
        let sql = match plan.display_order {
            Some(display) => self.dialect.wrap_reorder(&inner, &display),
            None => inner,
        };

        self.read_all_query(&sql, &params)
    }

    /// Cursor for the boundary row of a page returned by
    /// [`read_all_keyset`](Self::read_all_keyset).
    pub fn cursor(&self, order_by: &str, entity: &E) -> Result<KeysetCursor, Error> {
        let order = self.physical_order(parse_order_by(order_by)?);

        KeysetCursor::from_entity(&self.model, &order, entity)
    }

    // ======================================================================
    // DDL
    // ======================================================================

    pub fn create_table(&mut self) -> Result<(), Error> {
        let _span = Span::new(ExecKind::Ddl, self.model.type_name);
        let statements = self.dialect.create_table(&self.model);

        self.with_connection(|repo| {
            for sql in &statements {
                repo.execute(ExecKind::Ddl, sql, &[])?;
            }
            tracing::info!(entity = repo.model.type_name, table = %repo.model.table, "table created");

            Ok(())
        })
    }

    pub fn drop_table(&mut self) -> Result<(), Error> {
        let _span = Span::new(ExecKind::Ddl, self.model.type_name);
        let sql = self.dialect.drop_table(&self.model.table);

        self.with_connection(|repo| repo.execute(ExecKind::Ddl, &sql, &[]).map(|_| ()))
    }

    /// Create an index over columns named physically or by field.
    pub fn create_index(&mut self, name: &str, columns: &[&str], unique: bool) -> Result<(), Error> {
        let _span = Span::new(ExecKind::Ddl, self.model.type_name);
        let resolved: Vec<&str> = self
            .model
            .resolve_columns(columns)?
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        let sql = self
            .dialect
            .create_index(&self.model.table, name, &resolved, unique);

        self.with_connection(|repo| repo.execute(ExecKind::Ddl, &sql, &[]).map(|_| ()))
    }

    pub fn is_table_exists(&mut self) -> Result<bool, Error> {
        let table = self.model.table.clone();

        self.db_object_exists(&table.name, ObjectKind::Table, table.schema.as_deref())
    }

    pub fn is_index_exists(&mut self, name: &str) -> Result<bool, Error> {
        let probe = self.dialect.index_exists(&self.model.table, name);

        self.probe(&probe)
    }

    pub fn db_object_exists(
        &mut self,
        name: &str,
        kind: ObjectKind,
        schema: Option<&str>,
    ) -> Result<bool, Error> {
        let probe = self.dialect.object_exists(name, kind, schema)?;

        self.probe(&probe)
    }

    // ======================================================================
    // Connection and transaction scope
    // ======================================================================

    fn with_connection<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        if self.conn.is_open() {
            return f(self);
        }

        self.conn.open()?;
        let result = f(self);

        match (self.conn.close(), result) {
            (Ok(()), result) => result,
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(original)) => {
                tracing::warn!(entity = self.model.type_name, error = %err, "close failed after error");
                Err(original)
            }
        }
    }

    fn with_transaction<R>(
        &mut self,
        needed: bool,
        f: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.with_connection(|repo| {
            if !needed || repo.conn.in_transaction() {
                return f(repo);
            }

            repo.conn.begin()?;
            let result = f(repo).and_then(|value| repo.conn.commit().map(|()| value));

            if result.is_err()
                && let Err(err) = repo.conn.rollback()
            {
                tracing::warn!(entity = repo.model.type_name, error = %err, "rollback failed");
            }

            result
        })
    }

    // ======================================================================
    // Statement execution
    // ======================================================================

    fn trace(&self, kind: ExecKind, sql: &str, params: usize) {
        tracing::debug!(
            entity = self.model.type_name,
            table = %self.model.table,
            op = %kind,
            params,
            "executing statement"
        );
        if self.mapper.is_debug() {
            tracing::info!(target: "sqlmint::sql", entity = self.model.type_name, %sql);
        }
    }

    fn run(&mut self, kind: ExecKind, command: &Command) -> Result<(u64, Option<Value>), Error> {
        self.trace(kind, &command.sql, command.params.len());

        command.run(&mut *self.conn)
    }

    fn execute(&mut self, kind: ExecKind, sql: &str, params: &[Parameter]) -> Result<u64, Error> {
        self.trace(kind, sql, params.len());

        self.conn.execute(sql, params)
    }

    fn scalar(
        &mut self,
        kind: ExecKind,
        sql: &str,
        params: &[Parameter],
    ) -> Result<Option<Value>, Error> {
        self.trace(kind, sql, params.len());

        self.conn.query_scalar(sql, params)
    }

    fn probe(&mut self, command: &Command) -> Result<bool, Error> {
        let count = self.with_connection(|repo| {
            repo.scalar(ExecKind::Exists, &command.sql, &command.params)
        })?;

        Ok(scalar_count(count) > 0)
    }

    fn stream(
        &mut self,
        sql: &str,
        params: &[Parameter],
        on_entity: &mut dyn FnMut(E) -> Result<bool, Error>,
    ) -> Result<u64, Error> {
        self.trace(ExecKind::Read, sql, params.len());

        let model = Arc::clone(&self.model);
        let mut rows = 0u64;
        self.conn.query(sql, params, &mut |row| {
            let entity = map_row::<E>(&model, &row)?;
            rows += 1;
            on_entity(entity)
        })?;

        Ok(rows)
    }

    fn stream_all(
        &mut self,
        sql: &str,
        params: &[Parameter],
        on_entity: &mut dyn FnMut(E) -> Result<bool, Error>,
    ) -> Result<u64, Error> {
        let mut span = Span::new(ExecKind::Read, self.model.type_name);
        let rows = self.with_connection(|repo| repo.stream(sql, params, on_entity))?;
        span.set_rows(rows);

        Ok(rows)
    }

    fn first(&mut self, sql: &str, params: &[Parameter]) -> Result<Option<E>, Error> {
        let mut found = None;
        self.stream_all(sql, params, &mut |entity| {
            found = Some(entity);
            Ok(false)
        })?;

        Ok(found)
    }

    // ======================================================================
    // Bookkeeping
    // ======================================================================

    fn write_audit(&mut self, header: AuditHeader, changes: Vec<ColumnChange>) -> Result<(), Error> {
        let audit = self.mapper.audit();
        audit.ensure_audit_store(&mut *self.conn, &*self.dialect)?;

        let mut unit = audit.begin(header);
        unit.extend(changes);
        let details = unit.flush(&mut *self.conn, &*self.dialect)?;

        sink::record(MetricsEvent::AuditWritten {
            entity: self.model.type_name,
            details: details as u64,
        });

        Ok(())
    }

    fn conflict(&self, key: &[Value]) -> Error {
        let table = self.model.table.to_string();
        let key = key_text(key);

        tracing::warn!(
            entity = self.model.type_name,
            table = %table,
            key = %key,
            "concurrency conflict"
        );
        sink::record(MetricsEvent::ConcurrencyConflict {
            entity: self.model.type_name,
        });

        Error::concurrency(&table, key)
    }

    // Fill an unset version from the stored row.
    fn fill_version(&mut self, entity: &mut E) -> Result<(), Error> {
        let model = Arc::clone(&self.model);
        let Some(column) = model.reserved(ReservedColumn::VersionNo) else {
            return Ok(());
        };
        if !column.read(entity)?.is_empty_key() {
            return Ok(());
        }

        let key = model.key_values(entity)?;
        match self.current_version(&key)? {
            Some(version) => column.write(entity, &Value::Int(version)),
            None => Err(self.conflict(&key)),
        }
    }

    fn current_version(&mut self, key: &[Value]) -> Result<Option<i64>, Error> {
        let model = Arc::clone(&self.model);
        let Some(column) = model.reserved(ReservedColumn::VersionNo) else {
            return Ok(None);
        };

        let (predicate, params) = key_predicate(&model, key)?;
        let sql = format!("SELECT {} FROM {} WHERE {predicate}", column.name, model.table);
        let value = self.with_connection(|repo| repo.scalar(ExecKind::Read, &sql, &params))?;

        Ok(value.as_ref().and_then(i64::from_value))
    }

    fn check_references(&mut self, key: &Key<'_, E>, key_values: &[Value]) -> Result<(), Error> {
        let model = Arc::clone(&self.model);
        let is_active = self
            .mapper
            .config()
            .reserved_name(ReservedColumn::IsActive)
            .to_string();

        for vfk in &model.references {
            let value = self.reference_value(&model, vfk, key, key_values)?;
            if value.is_null() {
                continue;
            }

            let probe = build_reference_probe(&*self.dialect, vfk, &is_active, &value);
            let found = self.scalar(ExecKind::Exists, &probe.sql, &probe.params)?;
            if found.is_some_and(|v| !v.is_null()) {
                tracing::warn!(
                    entity = model.type_name,
                    table = %vfk.table,
                    column = %vfk.column,
                    "delete blocked by reference"
                );
                sink::record(MetricsEvent::ReferenceBlocked {
                    entity: model.type_name,
                });

                return Err(Error::reference(
                    &vfk.table,
                    &vfk.column,
                    vfk.display.as_deref(),
                ));
            }
        }

        Ok(())
    }

    // Value of the referenced key column for the record being deleted.
    fn reference_value(
        &mut self,
        model: &EntityModel,
        vfk: &VirtualForeignKey,
        key: &Key<'_, E>,
        key_values: &[Value],
    ) -> Result<Value, Error> {
        if let Some(value) = model
            .primary_keys()
            .position(|c| c.name == vfk.key_column)
            .and_then(|i| key_values.get(i))
        {
            return Ok(value.clone());
        }

        let column = model.column(&vfk.key_column).ok_or_else(|| {
            Error::configuration(
                ErrorOrigin::Repository,
                format!("reference key column '{}' is not mapped", vfk.key_column),
            )
        })?;
        if let Some(entity) = key.entity() {
            return column.read(entity);
        }

        let (predicate, params) = key_predicate(model, key_values)?;
        let sql = format!("SELECT {} FROM {} WHERE {predicate}", column.name, model.table);

        Ok(self
            .scalar(ExecKind::Read, &sql, &params)?
            .unwrap_or(Value::Null))
    }

    // ======================================================================
    // Query assembly
    // ======================================================================

    // FROM target and combined filter (caller filter, then status).
    fn source(&self, query: &ReadQuery) -> (String, Option<String>) {
        let from = match &query.source {
            Some(sql) => format!("({sql}) AS src"),
            None => self.model.table.to_string(),
        };

        let mut terms = Vec::new();
        if let Some(filter) = &query.filter {
            terms.push(format!("({filter})"));
        }
        if query.source.is_none()
            && let Some(column) = self.model.reserved(ReservedColumn::IsActive)
            && let Some(active) = query.status.is_active_filter()
        {
            terms.push(format!(
                "{} = {}",
                column.name,
                self.dialect.bool_literal(active)
            ));
        }

        let filter = (!terms.is_empty()).then(|| terms.join(" AND "));

        (from, filter)
    }

    // Select pieces for a query; `anchors` are columns the caller needs back
    // even when not asked for.
    fn select_parts(
        &self,
        query: &ReadQuery,
        anchors: &[&str],
    ) -> Result<(SelectParts, Vec<Parameter>), Error> {
        let mut columns: Vec<String> = match &query.columns {
            Some(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                self.model
                    .resolve_columns(&names)?
                    .into_iter()
                    .map(|c| c.name.clone())
                    .collect()
            }
            // a raw source decides its own columns
            None if query.source.is_some() => Vec::new(),
            None => self.model.read_columns().map(|c| c.name.clone()).collect(),
        };

        if !columns.is_empty() {
            for anchor in anchors {
                if !columns.iter().any(|c| c.eq_ignore_ascii_case(anchor)) {
                    columns.push((*anchor).to_string());
                }
            }
        }

        let columns = if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(", ")
        };
        let (from, filter) = self.source(query);

        Ok((
            SelectParts::new(columns, from).filter(filter),
            query.params.clone(),
        ))
    }

    // Order terms named by field are rewritten to their physical column.
    fn physical_order(&self, order: Vec<OrderTerm>) -> Vec<OrderTerm> {
        order
            .into_iter()
            .map(|term| {
                match self
                    .model
                    .column(&term.column)
                    .or_else(|| self.model.column_by_field(&term.column))
                {
                    Some(column) => OrderTerm::new(column.name.clone(), term.direction),
                    None => term,
                }
            })
            .collect()
    }
}

fn required_order(query: &ReadQuery) -> Result<&str, Error> {
    query
        .order_by
        .as_deref()
        .filter(|order| !order.trim().is_empty())
        .ok_or_else(|| Error::configuration(ErrorOrigin::Paging, "paged reads need an order by"))
}

// Populate a fresh entity from a row. Labels that map to no readable column
// (window helpers, extra expressions) are skipped.
fn map_row<E: EntityKind>(model: &EntityModel, row: &Row) -> Result<E, Error> {
    let mut entity = E::default();

    for (label, value) in row.iter() {
        if let Some(column) = model.column(label)
            && !column.ignore.read
        {
            column.write(&mut entity, value)?;
        }
    }

    Ok(entity)
}
