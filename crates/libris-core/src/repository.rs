//! Generic aggregate repository.
//!
//! Bridges an aggregate family and an event store: `get_by_id` replays a
//! stream into a fresh aggregate, `save` appends the aggregate's pending
//! events under a version guard. One repository instance exists per
//! aggregate family; the concrete store is passed in at construction.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::event_store::{EventStore, StoredEvent};

/// Event-sourced repository for aggregates of type `A`.
pub struct Repository<A> {
    store: Arc<dyn EventStore>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> Clone for Repository<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _aggregate: PhantomData,
        }
    }
}

impl<A> std::fmt::Debug for Repository<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("aggregate", &std::any::type_name::<A>())
            .finish_non_exhaustive()
    }
}

impl<A> Repository<A>
where
    A: AggregateRoot,
{
    /// Creates a repository backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            _aggregate: PhantomData,
        }
    }

    /// Folds a stored history into a fresh aggregate, in order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if an event cannot be decoded.
    pub fn replay(id: Uuid, history: &[StoredEvent]) -> Result<A, DomainError> {
        let mut aggregate = A::new(id);
        for stored in history {
            let event = A::Event::from_stored(stored)?;
            aggregate.apply(&event);
        }
        Ok(aggregate)
    }

    /// Loads an aggregate by replaying its stream. An unknown id yields a
    /// fresh aggregate at version 0.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if loading or decoding the history fails.
    #[instrument(skip(self), fields(aggregate = std::any::type_name::<A>()))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<A, DomainError> {
        let history = self.store.load_events(id).await?;
        let aggregate = Self::replay(id, &history)?;
        debug!(version = aggregate.version(), "aggregate reconstituted");
        Ok(aggregate)
    }

    /// Appends the aggregate's pending events and marks them committed.
    ///
    /// `expected_version` must be the version the aggregate was loaded at;
    /// the store then checks it against the stream. A save with nothing
    /// pending still goes through the store, so a stale version is reported
    /// even when no event is written.
    ///
    /// On `ConcurrencyConflict` (or any other failure) the pending events are
    /// retained and the error is returned unchanged; retry policy belongs to
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `expected_version` differs from
    /// the aggregate's version, and `DomainError` if the append fails.
    #[instrument(
        skip(self, aggregate),
        fields(aggregate_id = %aggregate.aggregate_id(), pending = aggregate.uncommitted_events().len())
    )]
    pub async fn save(&self, aggregate: &mut A, expected_version: i64) -> Result<(), DomainError> {
        if expected_version != aggregate.version() {
            return Err(DomainError::Validation(format!(
                "expected version {expected_version} does not match loaded version {} of {}",
                aggregate.version(),
                aggregate.aggregate_id()
            )));
        }

        let pending: Vec<StoredEvent> = aggregate
            .uncommitted_events()
            .iter()
            .map(DomainEvent::to_stored)
            .collect();

        let new_version = self
            .store
            .append_events(aggregate.aggregate_id(), expected_version, &pending)
            .await?;

        aggregate.mark_committed();
        debug!(new_version, "aggregate saved");
        Ok(())
    }
}
