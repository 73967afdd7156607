mod fail;
mod format;
mod reporter;

pub use self::fail::FailTrail;
pub use self::format::log_reporter;
pub use self::format::write_snapshot;
pub use self::reporter::ReporterThread;
pub use self::reporter::SnapshotReceiver;
pub use self::reporter::SnapshotSender;
pub use self::reporter::channel_reporter;
