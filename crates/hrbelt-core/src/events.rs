//! Observer events emitted by the connection manager.
//!
//! These are the manager's outward-facing notifications: device sightings,
//! connection lifecycle, discovery completion, decoded measurements, and
//! advisory protocol errors. All events are serializable for logging and
//! IPC.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use hrbelt_types::{BdAddr, HeartRateSample};

/// Events emitted while the monitor is running.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum MonitorEvent {
    /// A peripheral was seen (or re-seen) during scanning.
    DeviceDiscovered {
        address: BdAddr,
        name: String,
        rssi: i8,
    },
    /// A connection to the target peripheral was established.
    Connected { address: BdAddr, handle: u8 },
    /// The connection was lost or deliberately closed.
    Disconnected { address: Option<BdAddr> },
    /// GATT discovery finished and notifications were enabled.
    Ready { address: BdAddr, services: usize },
    /// A decoded heart-rate measurement arrived.
    Measurement {
        address: BdAddr,
        sample: HeartRateSample,
    },
    /// A GATT procedure completed with a non-zero result code. Advisory;
    /// discovery keeps going.
    ProtocolError { result: u16, att_handle: u16 },
}

/// Sender for monitor events.
pub type EventSender = broadcast::Sender<MonitorEvent>;

/// Receiver for monitor events.
pub type EventReceiver = broadcast::Receiver<MonitorEvent>;

/// Event dispatcher fanning events out to any number of subscribers.
///
/// Sending never blocks and never fails: if no subscriber is listening the
/// event is simply dropped.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a dispatcher with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers.
    pub fn send(&self, event: MonitorEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatcher_delivers_to_subscriber() {
        let dispatcher = EventDispatcher::new(8);
        let mut rx = dispatcher.subscribe();

        let address: BdAddr = "00:18:31:F0:EE:BE".parse().unwrap();
        dispatcher.send(MonitorEvent::Connected {
            address,
            handle: 0,
        });

        match rx.recv().await.unwrap() {
            MonitorEvent::Connected { address: a, handle } => {
                assert_eq!(a, address);
                assert_eq!(handle, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_send_without_subscribers_is_ok() {
        let dispatcher = EventDispatcher::new(8);
        dispatcher.send(MonitorEvent::ProtocolError {
            result: 0x0401,
            att_handle: 0,
        });
        assert_eq!(dispatcher.receiver_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let address: BdAddr = "00:18:31:F0:EE:BE".parse().unwrap();
        let event = MonitorEvent::DeviceDiscovered {
            address,
            name: "HRBelt".to_string(),
            rssi: -58,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"device_discovered\""));
        assert!(json.contains("HRBelt"));

        let back: MonitorEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, MonitorEvent::DeviceDiscovered { .. }));
    }
}
