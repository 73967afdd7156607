use std::io::Write;
use std::sync::Arc;

use tracing::info;

use super::super::Reporter;
use super::super::Result;
use super::super::Snapshot;


/// Writes the snapshot to the given writer, one entry per line.
///
/// Entries are sorted by key; see the `Display` implementation of `Snapshot`.
pub fn write_snapshot<W: Write>(snapshot: &Snapshot, writer: &mut W) -> Result<()> {
    write!(writer, "{}", snapshot)?;
    writer.flush()?;
    Ok(())
}

/// Reporter that emits each snapshot as a single `tracing` event.
pub fn log_reporter() -> Reporter {
    Arc::new(|snapshot: &Snapshot| {
        info!(entries = snapshot.len(), "trail: {}", inline(snapshot));
    })
}

/// Renders a snapshot as `key=value` pairs on one line.
fn inline(snapshot: &Snapshot) -> String {
    snapshot.keys().iter()
        .filter_map(|key| snapshot.value(key).map(|value| format!("{}={}", key, value)))
        .collect::<Vec<String>>()
        .join(" ")
}
