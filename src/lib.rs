//! Operation trails.
//!
//! A trail follows one operation as it runs: code annotates the trail of
//! the current thread with `here` and, once the operation is over, the
//! trail is finalized and a consolidated `Snapshot` of the annotations
//! (plus any process-wide globals) is sent to every registered reporter.
//!
//! ```
//! extern crate optrail;
//!
//! use optrail::utils::channel_reporter;
//!
//!
//! fn main() {
//!     let (reporter, receiver) = channel_reporter();
//!     optrail::register_reporter(move |snapshot| reporter(snapshot));
//!     optrail::put_global("service", "checkout");
//!
//!     let trail = optrail::begin("charge-card");
//!     trail.here("amount", 42);
//!     trail.succeed();
//!
//!     let snapshot = receiver.recv().unwrap();
//!     assert_eq!(snapshot.keys(), ["amount", "name", "service", "succeeded"]);
//! }
//! ```
extern crate arc_swap;
extern crate crossbeam_channel;
extern crate once_cell;
extern crate rand;
extern crate thiserror;
extern crate tracing;

mod config;
mod context;
mod errors;
mod manager;
mod reporter;
mod trail;
mod value;

pub mod utils;


pub use self::config::Config;
pub use self::config::Strictness;
pub use self::config::config;
pub use self::config::configure;

pub use self::context::ContextId;

pub use self::errors::Error;
pub use self::errors::Result;

pub use self::reporter::Reporter;

pub use self::trail::ERROR_KEY;
pub use self::trail::SUCCEEDED_KEY;
pub use self::trail::Trail;
pub use self::trail::TrailState;
pub use self::trail::snapshot::Entry;
pub use self::trail::snapshot::Snapshot;
pub use self::trail::timestamped::Timestamped;

pub use self::value::Value;

use std::sync::Arc;

use self::manager::T_MANAGER;
use self::reporter::R_MANAGER;


/// Key annotated by `begin` with the operation name.
pub const NAME_KEY: &str = "name";


/// Returns the calling thread's active trail, starting one if needed.
///
/// The trail is annotated with the operation `name`.
/// If the thread already has an active trail that trail is returned
/// and its name is overwritten.
pub fn begin(name: &str) -> Arc<Trail> {
    let trail = T_MANAGER.begin();
    trail.here(NAME_KEY, name);
    trail
}

/// Removes all registered reporters.
pub fn clear_reporters() {
    R_MANAGER.clear();
}

/// Returns the calling thread's active trail, if any.
pub fn current_trail() -> Option<Arc<Trail>> {
    T_MANAGER.get(ContextId::current())
}

/// Sets a value included in the snapshot of every trail finalized from now on.
///
/// Trail annotations with the same key take precedence over globals.
pub fn put_global<V: Into<Value>>(key: &str, value: V) {
    T_MANAGER.put_global(String::from(key), value.into());
}

/// Adds a reporter called with the snapshot of each finalized trail.
///
/// Reporters are called in registration order on the thread that
/// finalizes the trail.
pub fn register_reporter<F>(reporter: F)
    where F: Fn(&Snapshot) + Send + Sync + 'static
{
    R_MANAGER.register(Arc::new(reporter));
}


#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::MutexGuard;
    use std::sync::PoisonError;

    use once_cell::sync::Lazy;

    use super::Config;
    use super::Snapshot;

    static SERIAL: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    /// Serialises tests that depend on process-wide reporters or config.
    ///
    /// Reporters and config are reset to their defaults.
    pub fn serial() -> MutexGuard<'static, ()> {
        let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        super::clear_reporters();
        super::configure(Config::default());
        guard
    }

    /// Registers a reporter that stores every snapshot it receives.
    pub fn collect() -> Arc<Mutex<Vec<Snapshot>>> {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&reports);
        super::register_reporter(move |snapshot| {
            inner.lock().unwrap().push(snapshot.clone());
        });
        reports
    }

    /// Sorted keys of the trail's own annotations, ignoring globals.
    pub fn local_keys(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.keys().into_iter()
            .filter(|key| snapshot.get(key).and_then(|entry| entry.timestamped()).is_some())
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::Entry;
    use super::Value;
    use super::testing;

    #[test]
    fn begin_names_trail() {
        let _guard = testing::serial();
        let trail = super::begin("test-op");
        assert_eq!(trail.full_map().value("name"), Some(&Value::from("test-op")));
        let again = super::begin("renamed");
        assert!(Arc::ptr_eq(&trail, &again));
        assert_eq!(trail.full_map().value("name"), Some(&Value::from("renamed")));
        trail.vanish();
    }

    #[test]
    fn current_trail_per_thread() {
        let _guard = testing::serial();
        assert!(super::current_trail().is_none());
        let trail = super::begin("test-op");
        assert!(Arc::ptr_eq(&super::current_trail().unwrap(), &trail));
        let elsewhere = thread::spawn(|| super::current_trail().is_none()).join().unwrap();
        assert!(elsewhere);
        trail.vanish();
        assert!(super::current_trail().is_none());
    }

    #[test]
    fn locals_shadow_globals() {
        let _guard = testing::serial();
        let reports = testing::collect();
        super::put_global("lib-test-region", "eu-west");
        super::put_global("lib-test-shadowed", "global");
        let trail = super::begin("test-op");
        trail.here("lib-test-shadowed", "local");
        trail.succeed();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        match reports[0].get("lib-test-region") {
            Some(&Entry::Global(ref value)) => assert_eq!(value, &Value::from("eu-west")),
            _ => panic!("Global not found")
        }
        match reports[0].get("lib-test-shadowed") {
            Some(&Entry::Local(ref stamped)) => {
                assert_eq!(stamped.value(), &Value::from("local"))
            },
            _ => panic!("Local annotation did not shadow the global")
        }
    }

    #[test]
    fn snapshot_after_n_annotations() {
        let _guard = testing::serial();
        let trail = super::begin("test-op");
        for i in 0..5 {
            trail.here(&format!("step{}", i), i);
        }
        let snapshot = trail.full_map();
        assert_eq!(
            testing::local_keys(&snapshot),
            ["name", "step0", "step1", "step2", "step3", "step4"]
        );
        let globals = snapshot.len() - testing::local_keys(&snapshot).len();
        assert_eq!(globals, super::T_MANAGER.globals().len());
        trail.vanish();
    }

    #[test]
    fn clear_stops_reporting() {
        let _guard = testing::serial();
        let reports = testing::collect();
        super::clear_reporters();
        super::begin("test-op").succeed();
        assert!(reports.lock().unwrap().is_empty());
    }

    #[test]
    fn reporters_share_snapshot() {
        let _guard = testing::serial();
        let first = testing::collect();
        let second = testing::collect();
        super::begin("test-op").succeed();
        assert_eq!(*first.lock().unwrap(), *second.lock().unwrap());
        assert_eq!(first.lock().unwrap().len(), 1);
    }
}
