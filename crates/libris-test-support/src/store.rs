//! Test stores — mock `EventStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use libris_core::error::DomainError;
use libris_core::event_store::{EventStore, StoredEvent};
use uuid::Uuid;

/// An event store that records all `append_events` calls. Returns the
/// configured history from every `load_events` call and always accepts
/// appends, reporting `expected_version + events.len()` as the new version.
#[derive(Debug)]
pub struct RecordingEventStore {
    load_result: Mutex<Vec<StoredEvent>>,
    appended: Mutex<Vec<(Uuid, i64, Vec<StoredEvent>)>>,
}

impl RecordingEventStore {
    /// Create a new recording store that will return `history` from every
    /// `load_events` call.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self {
            load_result: Mutex::new(history),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all events that were appended.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(Uuid, i64, Vec<StoredEvent>)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.load_result.lock().unwrap().clone())
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        Ok(expected_version + events.len() as i64)
    }
}

/// An event store that always returns an empty history and silently accepts
/// appends. Useful for creation commands.
#[derive(Debug)]
pub struct EmptyEventStore;

#[async_trait]
impl EventStore for EmptyEventStore {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        Ok(expected_version + events.len() as i64)
    }
}

/// An event store whose stream is always at `actual`, so every append with
/// a different expected version conflicts.
#[derive(Debug)]
pub struct ConflictingEventStore {
    /// The version every append is compared against.
    pub actual: i64,
}

#[async_trait]
impl EventStore for ConflictingEventStore {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            expected: expected_version,
            actual: self.actual,
        })
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
