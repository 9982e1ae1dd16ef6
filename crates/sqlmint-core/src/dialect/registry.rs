use crate::{
    config::DialectConfig,
    connection::{ConnectionSignature, DialectKind},
    dialect::{Dialect, PostgresDialect, SqlServerDialect, SqliteDialect},
};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

///
/// DialectRegistry
///
/// One dialect per connection signature, created on first use and shared
/// afterwards. Same locking shape as the entity cache.
///

#[derive(Debug, Default)]
pub struct DialectRegistry {
    dialects: RwLock<HashMap<ConnectionSignature, Arc<dyn Dialect>>>,
}

impl DialectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signature: &ConnectionSignature, config: &DialectConfig) -> Arc<dyn Dialect> {
        if let Some(dialect) = self.dialects.read().get(signature) {
            return Arc::clone(dialect);
        }

        let mut dialects = self.dialects.write();
        let dialect = dialects.entry(signature.clone()).or_insert_with(|| {
            tracing::debug!(driver = %signature.driver, "dialect selected");
            create(signature.driver, config)
        });

        Arc::clone(dialect)
    }

    pub fn clear(&self) {
        self.dialects.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dialects.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dialects.read().is_empty()
    }
}

fn create(kind: DialectKind, config: &DialectConfig) -> Arc<dyn Dialect> {
    match kind {
        DialectKind::SqlServer => Arc::new(SqlServerDialect::new(config.sql_server_major_version)),
        DialectKind::Postgres => Arc::new(PostgresDialect),
        DialectKind::Sqlite => Arc::new(SqliteDialect),
    }
}
