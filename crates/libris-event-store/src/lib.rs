//! Event store implementations for the Libris catalogue.
//!
//! - [`pg_event_store::PgEventStore`]: durable log in PostgreSQL.
//! - [`in_memory::InMemoryEventStore`]: process-local log for tests and dev.
//! - [`publishing::PublishingEventStore`]: decorator that broadcasts every
//!   committed event on an event bus after the append succeeds.

pub mod in_memory;
pub mod pg_event_store;
pub mod publishing;

pub use in_memory::InMemoryEventStore;
pub use pg_event_store::PgEventStore;
pub use publishing::PublishingEventStore;
