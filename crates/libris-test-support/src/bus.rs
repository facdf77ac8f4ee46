//! Test buses — mock `EventBus` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use libris_core::bus::{EventBus, EventBusError, MessageStream};
use libris_core::event_store::StoredEvent;

/// A bus that records every published event and hands out empty
/// subscriptions.
#[derive(Debug, Default)]
pub struct RecordingEventBus {
    published: Mutex<Vec<StoredEvent>>,
}

impl RecordingEventBus {
    /// Creates an empty recording bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published events, in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<StoredEvent> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventBus for RecordingEventBus {
    async fn publish(&self, event: &StoredEvent) -> Result<(), EventBusError> {
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn subscribe(&self, _channels: &[String]) -> Result<MessageStream, EventBusError> {
        Ok(Box::pin(stream::empty()))
    }
}

/// A bus whose broker is always unreachable.
#[derive(Debug)]
pub struct FailingEventBus;

#[async_trait]
impl EventBus for FailingEventBus {
    async fn publish(&self, _event: &StoredEvent) -> Result<(), EventBusError> {
        Err(EventBusError::Transport("broker unreachable".into()))
    }

    async fn subscribe(&self, _channels: &[String]) -> Result<MessageStream, EventBusError> {
        Err(EventBusError::Transport("broker unreachable".into()))
    }
}
