use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;


static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_CONTEXT: ContextId = ContextId(
        NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)
    );
}


/// Identity of a thread of control.
///
/// Each native thread is assigned an id the first time it asks for one.
/// Ids come from a process-wide counter and are never reused so a live
/// thread can never share its id with another thread, dead or alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Returns the id of the calling thread.
    pub fn current() -> ContextId {
        CURRENT_CONTEXT.with(|id| *id)
    }

    /// Access the numeric value of the id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(id: u64) -> ContextId {
        ContextId(id)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
