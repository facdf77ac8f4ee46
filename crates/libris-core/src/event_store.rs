//! Event store abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a domain event.
///
/// This is both the persisted record and the broadcast message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate (stream) this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Append-only, per-stream event log with optimistic concurrency.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Load all events for a given aggregate, ordered by sequence number.
    /// An unknown stream yields an empty history.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append new events to an aggregate stream with optimistic concurrency.
    ///
    /// `expected_version` must equal the persisted stream length; the guard
    /// and the write happen as one atomic step. The store assigns contiguous
    /// sequence numbers starting at `expected_version + 1` and returns the
    /// new stream version. On a mismatch nothing is written and
    /// `DomainError::ConcurrencyConflict` is returned.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError>;
}

#[async_trait]
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        (**self).load_events(aggregate_id).await
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        (**self)
            .append_events(aggregate_id, expected_version, events)
            .await
    }
}

/// Stamps `events` with the contiguous sequence numbers an append at
/// `expected_version` assigns, overwriting whatever the caller filled in.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn assign_sequence_numbers(
    aggregate_id: Uuid,
    expected_version: i64,
    events: &[StoredEvent],
) -> Vec<StoredEvent> {
    events
        .iter()
        .enumerate()
        .map(|(i, event)| StoredEvent {
            aggregate_id,
            sequence_number: expected_version + i as i64 + 1,
            ..event.clone()
        })
        .collect()
}
