//! Event fan-out to build observers.
//!
//! The drive loop and the control handle publish through an [`EventBus`];
//! observers call [`EventBus::subscribe`] and receive every record published
//! afterwards. A subscriber that falls more than the configured capacity
//! behind receives [`broadcast::error::RecvError::Lagged`] and skips ahead.

use chrono::Utc;
use mason_types::{BuildEvent, BuildEventRecord, BuildId};
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast channel for [`BuildEventRecord`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BuildEventRecord>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` records per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all records published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BuildEventRecord> {
        self.tx.subscribe()
    }

    /// Publish an event for `build_id`. Returns the number of subscribers
    /// that received it; publishing with no subscribers is not an error.
    pub fn publish(&self, build_id: BuildId, event: BuildEvent) -> usize {
        let record = BuildEventRecord {
            build_id,
            at: Utc::now(),
            event,
        };
        let receivers = self.tx.send(record).unwrap_or(0);
        trace!(%build_id, receivers, "Build event published");
        receivers
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new(8);
        assert_eq!(bus.publish(BuildId::new(), BuildEvent::Paused), 0);
    }

    #[test]
    fn subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let id = BuildId::new();
        bus.publish(id, BuildEvent::Paused);
        bus.publish(id, BuildEvent::Resumed);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.build_id, id);
        assert_eq!(first.event, BuildEvent::Paused);
        assert_eq!(second.event, BuildEvent::Resumed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn published_record_serializes_for_observers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let id = BuildId::new();
        bus.publish(id, BuildEvent::Cancelled);

        let record = rx.try_recv().unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"]["type"], "cancelled");
        assert_eq!(json["build_id"], serde_json::to_value(id).unwrap());
        assert!(json["at"].is_string());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        bus.publish(BuildId::new(), BuildEvent::Finished);
        assert!(rx.try_recv().is_ok());
    }
}
