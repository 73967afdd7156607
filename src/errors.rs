use std::io;
use std::result;

use crossbeam_channel::SendError;
use thiserror::Error;

use super::ContextId;
use super::Snapshot;


/// Errors returned by the fallible parts of the crate.
///
/// Tracing an operation itself never fails: errors only come from the
/// edges of the crate (spawning hand-off threads, forwarding snapshots
/// over channels, strict annotation checks).
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("unable to forward snapshot: receiver disconnected")]
    SendError(#[from] SendError<Snapshot>),

    #[error("trail bound to context {expected} annotated from context {actual}")]
    WrongContext {
        expected: ContextId,
        actual: ContextId,
    },
}


/// Type alias for a `Result` with the crate's `Error`.
pub type Result<T> = result::Result<T, Error>;
