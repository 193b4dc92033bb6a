//! # Change Bus
//!
//! In-process fan-out of [`SyncMessage`]s over a tokio broadcast channel.
//!
//! The engine calls [`ChangeBus::notify`] after each successful commit; the
//! UI layer and the network transport each hold a subscription. A transport
//! relays drained messages to its peers and calls [`ChangeBus::inject`]
//! with messages received from them, so local subscribers refetch on remote
//! changes too.
//!
//! Notification is fire-and-forget: with no subscribers a send simply drops
//! the message, and the engine never treats that as an error.

use tokio::sync::broadcast;
use tracing::debug;

use crate::protocol::{SyncMessage, Table};

/// Default buffer size for the broadcast channel. A slow subscriber lagging
/// more than this many messages misses the oldest ones and should do a full
/// refetch.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Broadcast bus for data-change notifications.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<SyncMessage>,
}

impl ChangeBus {
    /// Creates a bus with the default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Creates a bus with an explicit buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        ChangeBus { sender }
    }

    /// Announces that a table was mutated.
    pub fn notify(&self, table: Table) {
        debug!(table = %table, "notifying table change");
        // Err means no subscribers are listening right now; nothing to do.
        let _ = self.sender.send(SyncMessage::DataChanged { table });
    }

    /// Re-broadcasts a message received from another device.
    pub fn inject(&self, message: SyncMessage) {
        let _ = self.sender.send(message);
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncMessage> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        ChangeBus::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_notifications() {
        let bus = ChangeBus::new();
        let mut rx = bus.subscribe();

        bus.notify(Table::Sales);
        bus.notify(Table::Products);

        assert_eq!(rx.recv().await.unwrap(), SyncMessage::DataChanged { table: Table::Sales });
        assert_eq!(
            rx.recv().await.unwrap(),
            SyncMessage::DataChanged { table: Table::Products }
        );
    }

    #[tokio::test]
    async fn notify_without_subscribers_is_silent() {
        let bus = ChangeBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        // Must not panic or error.
        bus.notify(Table::Customers);
    }

    #[tokio::test]
    async fn injected_remote_messages_reach_subscribers() {
        let bus = ChangeBus::new();
        let mut rx = bus.subscribe();

        let remote = SyncMessage::from_wire(
            r#"{"type":"DATA_CHANGED","payload":{"table":"customers"}}"#,
        )
        .unwrap();
        bus.inject(remote.clone());

        assert_eq!(rx.recv().await.unwrap(), remote);
    }

    #[tokio::test]
    async fn each_subscriber_sees_every_message() {
        let bus = ChangeBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.notify(Table::Expenses);

        assert!(matches!(a.recv().await.unwrap(), SyncMessage::DataChanged { table: Table::Expenses }));
        assert!(matches!(b.recv().await.unwrap(), SyncMessage::DataChanged { table: Table::Expenses }));
    }
}
