//! Forwards build events to the log.
//!
//! The demo has no operator who could resume a paused build, so an error
//! event cancels it instead of leaving the loop parked.

use mason_core::BuildHandle;
use mason_types::{BuildEvent, BuildEventRecord};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Log every event until the channel closes. Returns the number of events
/// seen.
pub async fn run(mut rx: broadcast::Receiver<BuildEventRecord>, handle: BuildHandle) -> u64 {
    let mut seen: u64 = 0;
    loop {
        let record = match rx.recv().await {
            Ok(record) => record,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event log fell behind");
                continue;
            }
            Err(RecvError::Closed) => return seen,
        };
        seen = seen.saturating_add(1);
        log_record(&record);
        if matches!(record.event, BuildEvent::Error { .. }) && handle.cancel() {
            info!(build_id = %record.build_id, "Cancelled after error");
        }
        if matches!(
            record.event,
            BuildEvent::Finished | BuildEvent::Stalled { .. } | BuildEvent::Cancelled
        ) {
            return seen;
        }
    }
}

fn log_record(record: &BuildEventRecord) {
    let build_id = record.build_id;
    match &record.event {
        BuildEvent::Progress { snapshot } => info!(
            %build_id,
            completed = snapshot.completed,
            remaining = snapshot.remaining,
            fraction = snapshot.fraction(),
            "Progress"
        ),
        BuildEvent::Error {
            kind,
            message,
            position,
        } => warn!(
            %build_id,
            %kind,
            position = ?position,
            cause = %message,
            "Build error"
        ),
        other => info!(%build_id, event = ?other, "Build event"),
    }
    if let Ok(json) = serde_json::to_string(record) {
        debug!(record = %json, "Event record");
    }
}
