//! Shared test mocks and utilities for the Libris catalogue.

mod bus;
mod clock;
mod event;
mod store;

pub use bus::{FailingEventBus, RecordingEventBus};
pub use clock::{FixedClock, fixed_now};
pub use event::make_stored_event;
pub use store::{ConflictingEventStore, EmptyEventStore, FailingEventStore, RecordingEventStore};
