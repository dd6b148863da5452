//! Process-wide cache of compiled autowire plans.
//!
//! Readers never lock: a lookup is an `ArcSwap` load of an immutable map.
//! Writers publish a copied map with a single compare-and-swap; a writer that
//! loses the race keeps using the plan it compiled and does not retry.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

use crate::autowire::{AutoWire, Plan};
use crate::error::DiResult;
use crate::registration::AnyArc;

static GLOBAL: Lazy<PlanCache> = Lazy::new(PlanCache::new);

/// Cache of autowire plans keyed by target type.
pub struct PlanCache {
    plans: ArcSwap<HashMap<TypeId, AnyArc>>,
    compiled: AtomicUsize,
}

impl PlanCache {
    pub fn new() -> Self {
        Self {
            plans: ArcSwap::from_pointee(HashMap::new()),
            compiled: AtomicUsize::new(0),
        }
    }

    /// The cache shared by every container in the process.
    pub fn global() -> &'static PlanCache {
        &GLOBAL
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        self.plans.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.load().is_empty()
    }

    /// Whether a plan for `T` has been published.
    pub fn contains<T: 'static>(&self) -> bool {
        self.plans.load().contains_key(&TypeId::of::<T>())
    }

    /// Number of plans compiled through this cache, including ones that lost a race.
    pub fn compiled_count(&self) -> usize {
        self.compiled.load(Ordering::Relaxed)
    }

    pub(crate) fn get_or_compile<T: AutoWire>(&self) -> DiResult<Arc<Plan<T>>> {
        let id = TypeId::of::<T>();
        if let Some(plan) = self.lookup::<T>(id) {
            return Ok(plan);
        }

        let plan = Arc::new(Plan::<T>::compile()?);
        self.compiled.fetch_add(1, Ordering::Relaxed);

        let current = self.plans.load_full();
        let mut next = HashMap::clone(&current);
        next.insert(id, plan.clone() as AnyArc);
        let previous = self.plans.compare_and_swap(&current, Arc::new(next));
        if Arc::ptr_eq(&*previous, &current) {
            tracing::debug!(target_type = std::any::type_name::<T>(), "cached autowire plan");
        } else {
            tracing::debug!(
                target_type = std::any::type_name::<T>(),
                "plan cache changed concurrently; using uncached plan"
            );
        }
        Ok(plan)
    }

    fn lookup<T: AutoWire>(&self, id: TypeId) -> Option<Arc<Plan<T>>> {
        let plans = self.plans.load();
        plans.get(&id)?.clone().downcast::<Plan<T>>().ok()
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache")
            .field("plans", &self.len())
            .field("compiled", &self.compiled_count())
            .finish()
    }
}
