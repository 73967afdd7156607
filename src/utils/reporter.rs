use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use std::thread;
use std::thread::Builder;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::unbounded;
use tracing::warn;

use super::super::Reporter;
use super::super::Result;
use super::super::Snapshot;


const STOP_DELAY_SEC_DEFAULT: u64 = 2;
const RECV_TIMEOUT_MSEC_DEFAULT: u64 = 50;


/// Type alias for an `crossbeam_channel::Receiver` of `Snapshot`s.
pub type SnapshotReceiver = Receiver<Snapshot>;

/// Type alias for an `crossbeam_channel::Sender` of `Snapshot`s.
pub type SnapshotSender = Sender<Snapshot>;


/// Creates a reporter that forwards snapshots over a channel.
///
/// Reporters run on the thread finalizing the trail: forwarding snapshots
/// to a channel moves any slow processing off that thread.
/// The receiving end is usually handed to a `ReporterThread`.
///
/// Snapshots finalized after the receiver is dropped are discarded
/// with a warning.
pub fn channel_reporter() -> (Reporter, SnapshotReceiver) {
    let (sender, receiver) = unbounded();
    let reporter: Reporter = Arc::new(move |snapshot: &Snapshot| {
        if let Err(error) = forward(&sender, snapshot) {
            warn!(%error, "discarding trail snapshot");
        }
    });
    (reporter, receiver)
}

fn forward(sender: &SnapshotSender, snapshot: &Snapshot) -> Result<()> {
    sender.send(snapshot.clone())?;
    Ok(())
}


/// A basic snapshot consumer backed by a background thread.
///
/// The reporter spawns a thread that loops until stopped and waits for `Snapshot`s.
/// Every time a snapshot is received the `ReporterFn` closure is called with it.
/// The `ReporterFn` closure is responsible for shipping the received snapshots.
///
/// The `ReporterThread` also supports clean shutdown of the receiver thread.
/// When `ReporterThread::stop` is called or an instance is dropped:
///
///   1. The calling thread is paused for the `stop_delay` duration.
///      This allows the reporter thread to process any `Snapshot`s still in the channel.
///   2. The background thread is informed to shutdown and the calling thread joins it.
///   3. As soon as any `Snapshot` is processed or receiving times out the thread is stopped.
///      Receiving snapshots times out every 50 milliseconds.
///
/// The thread also stops on its own once every sender is gone.
pub struct ReporterThread {
    stop_delay: Duration,
    stopping: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ReporterThread {
    /// Creates a new reporter waiting for snapshots on the `receiver`.
    ///
    /// The reporter starts with a spawned thread and runs until stopped or dropped.
    pub fn new<ReporterFn>(receiver: SnapshotReceiver, mut reporter: ReporterFn) -> ReporterThread
        where ReporterFn: FnMut(Snapshot) + Send + 'static
    {
        // Stopping flag.
        let stopping = Arc::new(AtomicBool::new(false));
        let inner_stopping = Arc::clone(&stopping);

        // Reporter thread loop.
        let thread = Builder::new().name("OpTrailReporter".into()).spawn(move || {
            while !inner_stopping.load(Ordering::Relaxed) {
                let timeout = Duration::from_millis(RECV_TIMEOUT_MSEC_DEFAULT);
                match receiver.recv_timeout(timeout) {
                    Ok(snapshot) => reporter(snapshot),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }).expect("Failed to spawn reporter thread");

        // Return a wrapper around the thread.
        ReporterThread {
            stop_delay: Duration::from_secs(STOP_DELAY_SEC_DEFAULT),
            stopping,
            thread_handle: Some(thread),
        }
    }

    /// Version of `new` that also sets the `stop_delay`.
    pub fn new_with_duration<ReporterFn>(
        receiver: SnapshotReceiver, stop_delay: Duration, reporter: ReporterFn
    ) -> ReporterThread
        where ReporterFn: FnMut(Snapshot) + Send + 'static
    {
        let mut reporter = ReporterThread::new(receiver, reporter);
        reporter.stop_delay(stop_delay);
        reporter
    }

    /// Updates the `stop_delay` for when the thread is stopped.
    pub fn stop_delay(&mut self, stop_delay: Duration) {
        self.stop_delay = stop_delay;
    }

    /// Stops the background thread and joins it.
    pub fn stop(&mut self) {
        if let Some(thread) = self.thread_handle.take() {
            thread::sleep(self.stop_delay);
            self.stopping.store(true, Ordering::Relaxed);
            thread.join().expect("Failed to join reporter thread");
        }
    }
}

impl Drop for ReporterThread {
    fn drop(&mut self) {
        self.stop()
    }
}
