use crate::{
    config::Config,
    error::Error,
    model::EntityModel,
    obs::sink::{self, MetricsEvent},
    traits::EntityKind,
};
use parking_lot::RwLock;
use std::{any::TypeId, collections::HashMap, sync::Arc};

///
/// EntityCache
///
/// Build-once, read-mostly cache of mapping plans keyed by Rust type.
/// Reads take the shared lock; a miss builds outside the lock and then
/// serializes only the insert.
///

#[derive(Debug, Default)]
pub struct EntityCache {
    plans: RwLock<HashMap<TypeId, Arc<EntityModel>>>,
}

impl EntityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping plan for `E`, built on first access.
    pub fn get<E: EntityKind>(&self, config: &Config) -> Result<Arc<EntityModel>, Error> {
        let id = TypeId::of::<E>();

        if let Some(plan) = self.plans.read().get(&id) {
            return Ok(Arc::clone(plan));
        }

        let built = Arc::new(EntityModel::build(E::DECLARATION, config)?);

        let mut plans = self.plans.write();
        // A concurrent caller may have won the race; keep the first plan.
        let plan = plans.entry(id).or_insert_with(|| {
            tracing::info!(
                entity = E::DECLARATION.type_name,
                table = %built.table,
                columns = built.columns.len(),
                "mapping plan built"
            );
            sink::record(MetricsEvent::CacheBuild {
                entity: E::DECLARATION.type_name,
            });
            Arc::clone(&built)
        });

        Ok(Arc::clone(plan))
    }

    /// Drop every cached plan (dialect or schema switch).
    pub fn clear(&self) {
        let mut plans = self.plans.write();
        if !plans.is_empty() {
            tracing::info!(plans = plans.len(), "mapping plan cache cleared");
        }
        plans.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.read().is_empty()
    }
}
