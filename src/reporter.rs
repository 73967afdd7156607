use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

use super::Snapshot;


pub(crate) static R_MANAGER: Lazy<ReporterManager> = Lazy::new(ReporterManager::new);


/// A consumer of finalized trails.
///
/// Reporters are called once per finalized (not vanished) trail with
/// the trail's consolidated `Snapshot`.
/// The same snapshot is shared by all reporters.
///
/// Reporters must not call back into the trail that produced the snapshot.
pub type Reporter = Arc<dyn Fn(&Snapshot) + Send + Sync>;


/// Copy-on-write list of registered reporters.
///
/// Registration builds a new list and publishes it in one swap, so a trail
/// being finalized always iterates a complete list that can not change
/// under it, even if reporters are added or cleared concurrently.
/// Readers never lock: `snapshot` is a single atomic load.
/// Writers are serialised by `writer` so no registration is lost.
pub struct ReporterManager {
    reporters: ArcSwap<Vec<Reporter>>,
    writer: Mutex<()>,
}

impl ReporterManager {
    pub fn new() -> ReporterManager {
        ReporterManager {
            reporters: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
        }
    }
}

impl ReporterManager {
    /// Removes all reporters.
    pub fn clear(&self) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish(Arc::new(Vec::new()));
    }

    /// Appends a reporter after all currently registered ones.
    pub fn register(&self, reporter: Reporter) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let old = self.snapshot();
        let mut reporters = Vec::with_capacity(old.len() + 1);
        reporters.extend(old.iter().cloned());
        reporters.push(reporter);
        self.publish(Arc::new(reporters));
    }

    /// Access the currently published list.
    pub fn snapshot(&self) -> Arc<Vec<Reporter>> {
        self.reporters.load_full()
    }

    fn publish(&self, reporters: Arc<Vec<Reporter>>) {
        self.reporters.store(reporters);
    }
}

impl Default for ReporterManager {
    fn default() -> ReporterManager {
        ReporterManager::new()
    }
}
