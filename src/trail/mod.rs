use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::result;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::thread::Builder;
use std::thread::JoinHandle;
use std::time::SystemTime;

use rand::random;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::ContextId;
use super::Error;
use super::Result;
use super::Strictness;
use super::Value;
use super::config;
use super::manager::T_MANAGER;
use super::reporter::R_MANAGER;

pub mod snapshot;
pub mod timestamped;

use self::snapshot::Entry;
use self::snapshot::Snapshot;
use self::timestamped::Timestamped;
use self::timestamped::TimestampedMap;


/// Key set to `true` or `false` when a trail is finalized.
pub const SUCCEEDED_KEY: &str = "succeeded";

/// Key holding the error a trail failed with.
pub const ERROR_KEY: &str = "error";


/// Lifecycle of a `Trail`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrailState {
    /// The trail accepts annotations.
    Active,

    /// The trail succeeded or failed and was reported.
    Finalized,

    /// The trail vanished without being reported.
    Discarded,
}

impl TrailState {
    fn from_u8(state: u8) -> TrailState {
        match state {
            0 => TrailState::Active,
            1 => TrailState::Finalized,
            _ => TrailState::Discarded,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            TrailState::Active => 0,
            TrailState::Finalized => 1,
            TrailState::Discarded => 2,
        }
    }
}


/// Model of an in progress operation.
///
/// A `Trail` collects timestamped annotations while the operation it
/// represents runs on a thread.
/// Once the operation is over the trail is either finalized, with
/// `Trail::succeed` or `Trail::fail`, or discarded with `Trail::vanish`.
/// Finalized trails are merged with the process globals and the resulting
/// `Snapshot` is handed to every registered reporter.
///
/// Each thread has at most one active trail, tracked by the process-wide
/// trail manager: `optrail::begin` and `optrail::current_trail` look it up.
/// `Trail::fork` temporarily replaces the active trail with a child and
/// `Trail::go` hands the operation off to a new thread.
///
/// # Examples
///
/// ```
/// extern crate optrail;
///
/// use std::num::ParseIntError;
///
///
/// fn parse(raw: &str) -> Result<i64, ParseIntError> {
///     let trail = optrail::begin("parse");
///     trail.here("raw", raw);
///     let parsed = trail.fail_if(raw.parse::<i64>())?;
///     trail.here("parsed", parsed);
///     trail.succeed();
///     Ok(parsed)
/// }
///
/// fn main() {
///     assert_eq!(parse("42").unwrap(), 42);
///     assert!(parse("forty-two").is_err());
/// }
/// ```
pub struct Trail {
    context: ContextId,
    data: RwLock<TimestampedMap>,
    id: u64,
    origin: Option<Arc<Trail>>,
    parent: Option<Arc<Trail>>,
    state: AtomicU8,
}

impl Trail {
    pub(crate) fn new(
        context: ContextId, parent: Option<Arc<Trail>>, origin: Option<Arc<Trail>>
    ) -> Trail {
        Trail {
            context,
            data: RwLock::new(TimestampedMap::new()),
            id: random::<u64>(),
            origin,
            parent,
            state: AtomicU8::new(TrailState::Active.as_u8()),
        }
    }
}

impl Trail {
    /// Finalizes the trail as failed if the result is an error.
    ///
    /// The result is returned unchanged either way so this can wrap
    /// any expression used with the `?` operator.
    /// See `Trail::fail` for what happens on error.
    pub fn fail_if<T, E>(&self, result: result::Result<T, E>) -> result::Result<T, E>
        where E: fmt::Display
    {
        result.map_err(|error| self.fail(error))
    }

    /// Finalizes the trail as failed and returns the error.
    ///
    /// The trail records `succeeded = false` and the rendered `error`
    /// (both with the same timestamp) and is reported.
    /// If the trail is no longer active nothing is recorded or reported.
    pub fn fail<E: fmt::Display>(&self, error: E) -> E {
        let value = Value::Error(error.to_string());
        self.fail_with(value);
        error
    }

    /// Version of `fail` that keeps the error itself in the snapshot.
    ///
    /// The `error` entry is a `Value::Any` holding a clone of `error`, so
    /// reporters can recover the concrete type with `Value::downcast_ref`.
    ///
    /// ```
    /// extern crate optrail;
    ///
    /// use std::num::ParseIntError;
    ///
    ///
    /// fn main() {
    ///     let trail = optrail::begin("parse");
    ///     let error = "x".parse::<i64>().unwrap_err();
    ///     trail.fail_any(error.clone());
    ///     let snapshot = trail.full_map();
    ///     let stored = snapshot.value(optrail::ERROR_KEY).unwrap();
    ///     assert_eq!(stored.downcast_ref::<ParseIntError>(), Some(&error));
    /// }
    /// ```
    pub fn fail_any<E>(&self, error: E) -> E
        where E: Clone + Send + Sync + 'static
    {
        self.fail_with(Value::any(error.clone()));
        error
    }

    /// Spawns a thread that continues the operation.
    ///
    /// Before `work` runs a new root trail is activated for the spawned
    /// thread, with this trail as its `origin`.
    /// The new trail is passed to `work`, which is responsible for
    /// finalizing or vanishing it: once `work` returns (or panics) the
    /// thread's active trail is removed and anything not reported is lost.
    ///
    /// Errors spawning the thread are returned to the caller.
    #[doc(alias = "transmute")]
    pub fn go<F, R>(self: &Arc<Self>, work: F) -> Result<JoinHandle<R>>
        where F: FnOnce(Arc<Trail>) -> R + Send + 'static,
              R: Send + 'static
    {
        self.hand_off(Builder::new(), work)
    }

    /// Version of `go` that also names the spawned thread.
    pub fn go_named<F, R>(self: &Arc<Self>, name: &str, work: F) -> Result<JoinHandle<R>>
        where F: FnOnce(Arc<Trail>) -> R + Send + 'static,
              R: Send + 'static
    {
        self.hand_off(Builder::new().name(String::from(name)), work)
    }

    /// Creates a child trail on the same thread.
    ///
    /// The child becomes the thread's active trail until it is finalized
    /// or vanishes, at which point this trail is active again.
    /// Annotations on the child never show up in this trail's snapshot.
    pub fn fork(self: &Arc<Self>) -> Arc<Trail> {
        let child = Arc::new(Trail::new(self.context, Some(Arc::clone(self)), None));
        trace!(trail = self.id, child = child.id, "forking trail");
        T_MANAGER.set(self.context, Arc::clone(&child));
        child
    }

    /// Merges the process globals with this trail's annotations.
    ///
    /// Annotations take precedence over globals with the same key.
    pub fn full_map(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (key, value) in T_MANAGER.globals() {
            snapshot.insert(key, Entry::Global(value));
        }
        let data = self.read_data();
        for (key, stamped) in data.iter() {
            snapshot.insert(key.clone(), Entry::Local(stamped.clone()));
        }
        snapshot
    }

    /// Records a timestamped annotation.
    ///
    /// Annotating an existing key replaces the previous value.
    /// Annotations made after the trail is finalized or vanished are ignored.
    ///
    /// # Panics
    ///
    /// Trails belong to the thread they were started on (or handed off to).
    /// Annotating from another thread is handled according to the configured
    /// `Strictness` and panics with the default configuration.
    /// Use `Trail::try_here` to get an error instead.
    pub fn here<V: Into<Value>>(&self, key: &str, value: V) -> &Trail {
        let actual = ContextId::current();
        if actual != self.context {
            match config().strictness_level() {
                Strictness::Ignore => (),
                Strictness::Warn => warn!(
                    trail = self.id, key,
                    expected = self.context.as_u64(), actual = actual.as_u64(),
                    "annotating trail from the wrong execution context"
                ),
                Strictness::Panic => panic!("annotating trail from the wrong execution context"),
            }
        }
        self.record(key, value.into());
        self
    }

    /// Finalizes the trail as succeeded.
    ///
    /// The trail records `succeeded = true` and is reported.
    /// Calling this on a trail that is no longer active does nothing.
    pub fn succeed(&self) {
        {
            let mut data = self.write_data();
            if !self.conclude(TrailState::Finalized) {
                debug!(trail = self.id, "trail already concluded, ignoring success");
                return;
            }
            data.insert(String::from(SUCCEEDED_KEY), Timestamped::new(true));
        }
        self.finalize(true);
    }

    /// Version of `here` that rejects annotations from the wrong thread.
    pub fn try_here<V: Into<Value>>(&self, key: &str, value: V) -> Result<&Trail> {
        let actual = ContextId::current();
        if actual != self.context {
            return Err(Error::WrongContext {
                expected: self.context,
                actual,
            });
        }
        self.record(key, value.into());
        Ok(self)
    }

    /// Discards the trail without reporting it.
    ///
    /// All annotations are dropped and the thread's previous trail, if any,
    /// is active again.
    /// Later calls to `succeed` or `fail` do nothing.
    pub fn vanish(&self) {
        {
            let mut data = self.write_data();
            if !self.conclude(TrailState::Discarded) {
                debug!(trail = self.id, "trail already concluded, ignoring vanish");
                return;
            }
            *data = TimestampedMap::new();
        }
        self.finalize(false);
    }
}

impl Trail {
    /// The thread this trail belongs to.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Random identifier of the trail.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns true once the trail succeeded, failed or vanished.
    pub fn is_finalized(&self) -> bool {
        self.state() != TrailState::Active
    }

    /// The trail this trail was handed off from, with `Trail::go`.
    pub fn origin(&self) -> Option<&Arc<Trail>> {
        self.origin.as_ref()
    }

    /// The trail this trail was forked from, with `Trail::fork`.
    pub fn parent(&self) -> Option<&Arc<Trail>> {
        self.parent.as_ref()
    }

    pub fn state(&self) -> TrailState {
        TrailState::from_u8(self.state.load(Ordering::Acquire))
    }
}

impl Trail {
    /// Closest ancestor still waiting for its children to conclude.
    fn active_ancestor(&self) -> Option<Arc<Trail>> {
        let mut ancestor = self.parent.as_ref();
        while let Some(trail) = ancestor {
            if trail.state() == TrailState::Active {
                return Some(Arc::clone(trail));
            }
            ancestor = trail.parent.as_ref();
        }
        None
    }

    /// Moves out of `Active`, only the first transition wins.
    ///
    /// Callers hold the data write lock so the terminal entries land
    /// before anyone can read the concluded trail.
    fn conclude(&self, state: TrailState) -> bool {
        self.state.compare_exchange(
            TrailState::Active.as_u8(), state.as_u8(),
            Ordering::AcqRel, Ordering::Acquire
        ).is_ok()
    }

    /// Records a failure: `succeeded = false` and `error`, both stamped with one instant.
    fn fail_with(&self, error: Value) {
        {
            let mut data = self.write_data();
            if !self.conclude(TrailState::Finalized) {
                debug!(trail = self.id, "trail already concluded, ignoring failure");
                return;
            }
            let now = SystemTime::now();
            data.insert(String::from(SUCCEEDED_KEY), Timestamped::at(now, false));
            data.insert(String::from(ERROR_KEY), Timestamped::at(now, error));
        }
        self.finalize(true);
    }

    fn finalize(&self, report: bool) {
        let _restore = RegistryRestore(self);
        if report {
            self.report();
        }
    }

    fn hand_off<F, R>(self: &Arc<Self>, builder: Builder, work: F) -> Result<JoinHandle<R>>
        where F: FnOnce(Arc<Trail>) -> R + Send + 'static,
              R: Send + 'static
    {
        let origin = Arc::clone(self);
        let handle = builder.spawn(move || {
            let context = ContextId::current();
            let trail = Arc::new(Trail::new(context, None, Some(origin)));
            trace!(trail = trail.id, context = context.as_u64(), "trail handed off");
            T_MANAGER.set(context, Arc::clone(&trail));
            let _binding = ContextBinding(context);
            work(trail)
        })?;
        Ok(handle)
    }

    fn read_data(&self) -> RwLockReadGuard<TimestampedMap> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, key: &str, value: Value) {
        let mut data = self.write_data();
        // Checked under the lock: nothing lands after the final snapshot.
        if self.state() != TrailState::Active {
            debug!(trail = self.id, key, "trail already concluded, ignoring annotation");
            return;
        }
        data.insert(String::from(key), Timestamped::new(value));
    }

    fn report(&self) {
        let reporters = R_MANAGER.snapshot();
        if reporters.is_empty() {
            return;
        }
        let snapshot = self.full_map();
        let isolate = config().reporters_isolated();
        for reporter in reporters.iter() {
            if !isolate {
                reporter(&snapshot);
                continue;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| reporter(&snapshot)));
            if outcome.is_err() {
                error!(trail = self.id, "reporter panicked while handling a snapshot");
            }
        }
    }

    fn write_data(&self) -> RwLockWriteGuard<TimestampedMap> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Trail {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Trail")
            .field("id", &self.id)
            .field("context", &self.context)
            .field("state", &self.state())
            .field("parent", &self.parent.as_ref().map(|trail| trail.id))
            .field("origin", &self.origin.as_ref().map(|trail| trail.id))
            .finish()
    }
}


/// Hands the context back to the closest active ancestor of a concluded trail.
///
/// Runs on drop so the registry is updated even if a reporter panics.
struct RegistryRestore<'a>(&'a Trail);

impl<'a> Drop for RegistryRestore<'a> {
    fn drop(&mut self) {
        let trail = self.0;
        let replacement = trail.active_ancestor();
        trace!(
            trail = trail.id, state = ?trail.state(),
            restored = ?replacement.as_ref().map(|ancestor| ancestor.id),
            "trail concluded"
        );
        T_MANAGER.replace_if_current(trail.context, trail, replacement);
    }
}


/// Unbinds a handed-off thread from its trail when the thread's work ends.
struct ContextBinding(ContextId);

impl Drop for ContextBinding {
    fn drop(&mut self) {
        T_MANAGER.remove(self.0);
    }
}
