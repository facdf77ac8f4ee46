//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate roots that reconstitute from event history.
///
/// An aggregate moves through `New` (freshly constructed, version 0),
/// `Hydrated` (history replayed), and `Dirty` (pending events recorded by a
/// command). A successful save returns it to `Hydrated` at the new version.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Constructs an empty aggregate with no history.
    fn new(id: Uuid) -> Self
    where
        Self: Sized;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the persisted version (number of committed events).
    fn version(&self) -> i64;

    /// Apply a historical event to mutate internal state and advance the
    /// version by one (used during reconstitution).
    fn apply(&mut self, event: &Self::Event);

    /// Returns pending events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Marks pending events as committed: the version advances by the number
    /// of pending events and the pending sequence is cleared.
    fn mark_committed(&mut self);

    /// Returns the sequence number the next recorded event will receive.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version() + self.uncommitted_events().len() as i64 + 1
    }
}
