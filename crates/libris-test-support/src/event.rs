//! Builders for stored events.

use libris_core::event_store::StoredEvent;
use uuid::Uuid;

use crate::clock::fixed_now;

/// Helper to build a `StoredEvent` with sensible defaults.
#[must_use]
pub fn make_stored_event(
    aggregate_id: Uuid,
    event_type: &str,
    payload: serde_json::Value,
    sequence_number: i64,
) -> StoredEvent {
    StoredEvent {
        event_id: Uuid::new_v4(),
        aggregate_id,
        event_type: event_type.to_owned(),
        payload,
        sequence_number,
        correlation_id: Uuid::new_v4(),
        causation_id: Uuid::new_v4(),
        occurred_at: fixed_now(),
    }
}
