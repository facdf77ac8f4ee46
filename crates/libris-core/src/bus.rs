//! Event bus abstraction (publish/subscribe broadcast of committed events).
//!
//! The bus is for distribution, not storage: the event store is the source of
//! truth and publishing is best-effort. Delivery is at-least-once with no
//! ordering guarantee across streams. Each event is broadcast on the channel
//! named by its kind.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::event_store::StoredEvent;

/// Errors raised while publishing to or subscribing on the bus.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The event could not be serialized into a message body.
    #[error("event serialization failed: {0}")]
    Serialization(String),

    /// The broker rejected or failed to carry the message.
    #[error("transport error: {0}")]
    Transport(String),

    /// The bus (or a subscription) has been shut down.
    #[error("event bus closed")]
    Closed,
}

/// A raw message as carried by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Channel the message arrived on (the event kind).
    pub channel: String,
    /// Serialized `StoredEvent`.
    pub payload: String,
}

impl BusMessage {
    /// Serializes an event into a message on the channel named by its kind.
    ///
    /// # Errors
    ///
    /// Returns `EventBusError::Serialization` if JSON encoding fails.
    pub fn encode(event: &StoredEvent) -> Result<Self, EventBusError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| EventBusError::Serialization(e.to_string()))?;
        Ok(Self {
            channel: event.event_type.clone(),
            payload,
        })
    }

    /// Decodes the message body back into an event.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the body is not a serialized `StoredEvent`.
    pub fn decode(&self) -> Result<StoredEvent, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// Stream of raw messages produced by a subscription.
pub type MessageStream = BoxStream<'static, Result<BusMessage, EventBusError>>;

/// Publish/subscribe fan-out of committed events.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Serializes `event` and broadcasts it on the channel named by its kind.
    async fn publish(&self, event: &StoredEvent) -> Result<(), EventBusError>;

    /// Opens one subscription covering `channels`. Fan-out to individual
    /// handlers is the subscriber's concern.
    async fn subscribe(&self, channels: &[String]) -> Result<MessageStream, EventBusError>;
}

#[async_trait]
impl<B> EventBus for Arc<B>
where
    B: EventBus + ?Sized,
{
    async fn publish(&self, event: &StoredEvent) -> Result<(), EventBusError> {
        (**self).publish(event).await
    }

    async fn subscribe(&self, channels: &[String]) -> Result<MessageStream, EventBusError> {
        (**self).subscribe(channels).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_encode_uses_event_kind_as_channel() {
        let event = StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            event_type: "catalog.book_renamed".to_owned(),
            payload: serde_json::json!({"title": "y"}),
            sequence_number: 2,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        };

        let message = BusMessage::encode(&event).unwrap();

        assert_eq!(message.channel, "catalog.book_renamed");
        assert_eq!(message.decode().unwrap(), event);
    }

    #[test]
    fn test_decode_rejects_foreign_body() {
        let message = BusMessage {
            channel: "catalog.book_renamed".to_owned(),
            payload: "not json".to_owned(),
        };

        assert!(message.decode().is_err());
    }
}
