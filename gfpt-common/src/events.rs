//! Event types and in-process event bus
//!
//! Services publish domain events on a broadcast channel; SSE clients
//! subscribe to it. Publishing never blocks and never fails a request.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Domain events broadcast to SSE subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GfptEvent {
    /// A machine part passed its next-service date
    #[serde(rename_all = "camelCase")]
    ServiceDue {
        notification_id: Uuid,
        machine_id: String,
        part_name: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A daily production record was created
    #[serde(rename_all = "camelCase")]
    ProductionEntryCreated {
        record_id: Uuid,
        operator_id: String,
        line: String,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    /// Hourly production was recorded on a live record
    #[serde(rename_all = "camelCase")]
    HourlyProductionRecorded {
        record_id: Uuid,
        hours: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// An operator moved to another line mid-shift
    #[serde(rename_all = "camelCase")]
    OperatorTransferred {
        operator_id: String,
        from_line: String,
        to_line: String,
        net_minutes: i64,
        timestamp: DateTime<Utc>,
    },
}

impl GfptEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            GfptEvent::ServiceDue { .. } => "ServiceDue",
            GfptEvent::ProductionEntryCreated { .. } => "ProductionEntryCreated",
            GfptEvent::HourlyProductionRecorded { .. } => "HourlyProductionRecorded",
            GfptEvent::OperatorTransferred { .. } => "OperatorTransferred",
        }
    }
}

/// Broadcast bus shared by handlers and background tasks
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GfptEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<GfptEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: GfptEvent,
    ) -> Result<usize, broadcast::error::SendError<GfptEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GfptEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_event() -> GfptEvent {
        GfptEvent::OperatorTransferred {
            operator_id: "OP-001".to_string(),
            from_line: "L1".to_string(),
            to_line: "L2".to_string(),
            net_minutes: 60,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(transfer_event()).is_err());
        // Lossy variant swallows the same condition
        bus.emit_lossy(transfer_event());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let event = transfer_event();
        bus.emit(event.clone()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(transfer_event()).unwrap();
        assert_eq!(json["type"], "operatorTransferred");
        assert_eq!(json["fromLine"], "L1");
        assert_eq!(json["netMinutes"], 60);
        assert_eq!(transfer_event().event_type(), "OperatorTransferred");
    }
}
