//! Event bus implementations for the Libris catalogue.
//!
//! - [`in_memory::InMemoryEventBus`]: process-local broadcast for tests and dev.
//! - [`redis_bus::RedisEventBus`]: Redis pub/sub, one channel per event kind.

pub mod in_memory;
pub mod redis_bus;

pub use in_memory::InMemoryEventBus;
pub use redis_bus::RedisEventBus;
