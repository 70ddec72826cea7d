//! Event bus for engine and widget events
//!
//! A broadcast-channel pub/sub: subscribing returns a receiver that sees
//! every event published afterwards, in publish order, and unsubscribing
//! is dropping the receiver; a dropped receiver is never invoked again.
//! Publishing with no subscribers is a no-op, and a slow subscriber can
//! only lag itself, never the publisher or the other subscribers.

pub mod events;

pub use events::EngineEvent;

use tokio::sync::broadcast;

/// Channel capacity for broadcast events
const CHANNEL_CAPACITY: usize = 1024;

/// Event bus for engine events
///
/// Cloning is cheap and every clone shares the same underlying channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a bus with the default capacity (1024 events)
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a bus with a custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never blocks and never fails; with no subscribers the event is
    /// simply dropped.
    pub fn publish(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
