use crate::{
    audit::AuditStore,
    config::Config,
    connection::{Connection, ConnectionSignature},
    dialect::{Dialect, DialectRegistry},
    error::Error,
    model::{EntityCache, EntityModel},
    repository::Repository,
    traits::EntityKind,
};
use std::sync::Arc;

///
/// Mapper
///
/// Process-level handle: configuration, the mapping-plan cache, the dialect
/// registry, and the audit store. Share one per process; repositories borrow
/// it per call site.
///

#[derive(Debug)]
pub struct Mapper {
    config: Config,
    entities: EntityCache,
    dialects: DialectRegistry,
    audit: AuditStore,
    debug: bool,
}

impl Mapper {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let audit = AuditStore::new(&config.audit);

        Self {
            config,
            entities: EntityCache::new(),
            dialects: DialectRegistry::new(),
            audit,
            debug: false,
        }
    }

    /// Emit the SQL text of every statement through `tracing`.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the configuration. Every cached plan and dialect is dropped.
    pub fn set_config(&mut self, config: Config) {
        self.audit = AuditStore::new(&config.audit);
        self.config = config;
        self.clear_caches();
    }

    /// Drop cached plans, dialects, and audit bootstrap state.
    pub fn clear_caches(&self) {
        self.entities.clear();
        self.dialects.clear();
        self.audit.reset();
    }

    /// Mapping plan for `E`.
    pub fn plan<E: EntityKind>(&self) -> Result<Arc<EntityModel>, Error> {
        self.entities.get::<E>(&self.config)
    }

    #[must_use]
    pub fn dialect(&self, signature: &ConnectionSignature) -> Arc<dyn Dialect> {
        self.dialects.get(signature, &self.config.dialect)
    }

    #[must_use]
    pub const fn audit(&self) -> &AuditStore {
        &self.audit
    }

    #[must_use]
    pub const fn entities(&self) -> &EntityCache {
        &self.entities
    }

    /// Repository for `E` over a borrowed connection.
    pub fn repository<'a, E, C>(&'a self, conn: &'a mut C) -> Result<Repository<'a, E, C>, Error>
    where
        E: EntityKind,
        C: Connection + ?Sized,
    {
        Repository::new(self, conn)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
