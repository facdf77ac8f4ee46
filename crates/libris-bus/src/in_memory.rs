//! In-memory event bus built on `tokio::sync::broadcast`.
//!
//! Publishing with no live subscriber is not an error; the message is simply
//! dropped, as it would be on a real pub/sub broker.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::StreamExt;
use futures::future;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

use libris_core::bus::{BusMessage, EventBus, EventBusError, MessageStream};
use libris_core::event_store::StoredEvent;

/// Default broadcast buffer size.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Process-local event bus.
#[derive(Debug, Clone)]
pub struct InMemoryEventBus {
    tx: broadcast::Sender<BusMessage>,
}

impl InMemoryEventBus {
    /// Creates a bus whose subscribers may fall at most `capacity` messages
    /// behind before they start losing messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: &StoredEvent) -> Result<(), EventBusError> {
        let message = BusMessage::encode(event)?;
        let receivers = self.tx.send(message).unwrap_or(0);
        trace!(event_type = %event.event_type, receivers, "event broadcast");
        Ok(())
    }

    async fn subscribe(&self, channels: &[String]) -> Result<MessageStream, EventBusError> {
        let channels: HashSet<String> = channels.iter().cloned().collect();
        let stream = BroadcastStream::new(self.tx.subscribe())
            .map(|r| r.map_err(|e| EventBusError::Transport(e.to_string())))
            .filter(move |r| {
                future::ready(match r {
                    Ok(message) => channels.contains(&message.channel),
                    Err(_) => true,
                })
            });
        Ok(Box::pin(stream))
    }
}
