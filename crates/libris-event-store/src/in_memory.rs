//! In-memory append-only event store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;
use uuid::Uuid;

use libris_core::error::DomainError;
use libris_core::event_store::{EventStore, StoredEvent, assign_sequence_numbers};

type Stream = Arc<Mutex<Vec<StoredEvent>>>;

/// In-memory append-only event store.
///
/// Each stream has its own lock, so appends to different streams never wait
/// on each other. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<Uuid, Stream>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn stream(&self, aggregate_id: Uuid) -> Stream {
        if let Some(stream) = self.streams.read().await.get(&aggregate_id) {
            return Arc::clone(stream);
        }
        let mut streams = self.streams.write().await;
        Arc::clone(streams.entry(aggregate_id).or_default())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let stream = self.streams.read().await.get(&aggregate_id).cloned();
        match stream {
            Some(stream) => Ok(stream.lock().await.clone()),
            None => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self, events), fields(count = events.len()), err)]
    #[allow(clippy::cast_possible_wrap)]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        let stream = self.stream(aggregate_id).await;
        let mut stream = stream.lock().await;

        let current = stream.len() as i64;
        if current != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current,
            });
        }

        stream.extend(assign_sequence_numbers(
            aggregate_id,
            expected_version,
            events,
        ));
        Ok(stream.len() as i64)
    }
}
