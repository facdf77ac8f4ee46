//! Append-then-publish decorator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use libris_core::bus::EventBus;
use libris_core::error::DomainError;
use libris_core::event_store::{EventStore, StoredEvent, assign_sequence_numbers};
use libris_core::locks::KeyedLocks;

/// Event store decorator that publishes every committed event on a bus.
///
/// Publishing happens after the append succeeds and before `append_events`
/// returns, one event at a time in sequence order. The stream stays locked
/// until publishing is done, so events of one stream reach the bus in the
/// order they were committed. A failed publish is logged and does not fail
/// the append: the log is the source of truth.
pub struct PublishingEventStore<S> {
    inner: S,
    bus: Arc<dyn EventBus>,
    locks: KeyedLocks<Uuid>,
}

impl<S> PublishingEventStore<S>
where
    S: EventStore,
{
    /// Wraps `inner` so that its appends are published on `bus`.
    pub fn new(inner: S, bus: Arc<dyn EventBus>) -> Self {
        Self {
            inner,
            bus,
            locks: KeyedLocks::new(),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn publish_all(&self, events: &[StoredEvent]) {
        for event in events {
            match self.bus.publish(event).await {
                Ok(()) => debug!(
                    event_type = %event.event_type,
                    aggregate_id = %event.aggregate_id,
                    sequence_number = event.sequence_number,
                    "event published"
                ),
                Err(e) => warn!(
                    event_type = %event.event_type,
                    aggregate_id = %event.aggregate_id,
                    sequence_number = event.sequence_number,
                    error = %e,
                    "failed to publish committed event"
                ),
            }
        }
    }
}

impl<S> std::fmt::Debug for PublishingEventStore<S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishingEventStore")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> EventStore for PublishingEventStore<S>
where
    S: EventStore,
{
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.load_events(aggregate_id).await
    }

    #[instrument(skip(self, events), fields(count = events.len()), err)]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        let _guard = self.locks.lock(aggregate_id).await;

        let version = self
            .inner
            .append_events(aggregate_id, expected_version, events)
            .await?;

        let committed = assign_sequence_numbers(aggregate_id, expected_version, events);
        self.publish_all(&committed).await;

        Ok(version)
    }
}
