use std::collections::HashMap;
use std::ptr;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use once_cell::sync::Lazy;
use tracing::trace;

use super::ContextId;
use super::Trail;
use super::Value;


pub(crate) static T_MANAGER: Lazy<TrailManager> = Lazy::new(TrailManager::new);


/// State guarded by the `TrailManager` lock.
#[derive(Default)]
struct Registry {
    globals: HashMap<String, Value>,
    trails: HashMap<ContextId, Arc<Trail>>,
}


/// Registry of the active trail for each thread of control.
///
/// The manager also owns the process-wide globals that are merged into
/// every trail's snapshot.
/// Lookups take the read lock, everything else takes the write lock.
/// Neither lock is ever held while user code (reporters, hand-off
/// closures) runs.
pub struct TrailManager {
    registry: RwLock<Registry>,
}

impl TrailManager {
    pub fn new() -> TrailManager {
        TrailManager {
            registry: RwLock::new(Registry::default()),
        }
    }
}

impl TrailManager {
    /// Returns the calling thread's active trail, creating a root trail if needed.
    ///
    /// A trail left registered after it concluded is replaced by a new root.
    pub fn begin(&self) -> Arc<Trail> {
        let context = ContextId::current();
        if let Some(trail) = self.get(context) {
            if !trail.is_finalized() {
                return trail;
            }
        }
        let mut registry = self.write();
        if let Some(trail) = registry.trails.get(&context) {
            if !trail.is_finalized() {
                return Arc::clone(trail);
            }
            trace!(context = context.as_u64(), trail = trail.id(), "replacing concluded trail");
        }
        trace!(context = context.as_u64(), "starting root trail");
        let trail = Arc::new(Trail::new(context, None, None));
        registry.trails.insert(context, Arc::clone(&trail));
        trail
    }

    /// Returns the active trail for the given context, if any.
    pub fn get(&self, context: ContextId) -> Option<Arc<Trail>> {
        self.read().trails.get(&context).cloned()
    }

    /// Copies the current globals.
    pub fn globals(&self) -> HashMap<String, Value> {
        self.read().globals.clone()
    }

    /// Inserts or overwrites a global value.
    pub fn put_global(&self, key: String, value: Value) {
        self.write().globals.insert(key, value);
    }

    /// Removes the context's trail, if any.
    pub fn remove(&self, context: ContextId) {
        self.write().trails.remove(&context);
    }

    /// Makes `trail` the active trail for the context.
    pub fn set(&self, context: ContextId, trail: Arc<Trail>) {
        self.write().trails.insert(context, trail);
    }

    /// Replaces the context's active trail only if it is still `current`.
    ///
    /// A `None` replacement removes the binding.
    /// Returns `false`, leaving the registry untouched, if some other trail
    /// became active for the context in the meantime.
    pub fn replace_if_current(
        &self, context: ContextId, current: &Trail, replacement: Option<Arc<Trail>>
    ) -> bool {
        let mut registry = self.write();
        let is_current = registry.trails.get(&context)
            .map(|active| ptr::eq(&**active, current))
            .unwrap_or(false);
        if !is_current {
            return false;
        }
        match replacement {
            Some(trail) => { registry.trails.insert(context, trail); },
            None => { registry.trails.remove(&context); },
        };
        true
    }

    fn read(&self) -> RwLockReadGuard<Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TrailManager {
    fn default() -> TrailManager {
        TrailManager::new()
    }
}
