//! Libris read side.
//!
//! Committed events arrive from the bus, are decoded once and handed to every
//! handler registered for their kind. Projection handlers fold them into JSON
//! documents kept in a key/value cache, and read-model facades serve those
//! documents to callers. Reads are eventually consistent with the write side.

pub mod cache;
pub mod dispatcher;
pub mod error;
pub mod facade;
pub mod handler;
pub mod projection;
pub mod redis_cache;
pub mod worker;

pub use cache::{InMemoryProjectionCache, ProjectionCache};
pub use dispatcher::{DispatchReport, EventDispatcher};
pub use error::{CacheError, HandlerError, ReadModelError};
pub use facade::ReadModelFacade;
pub use handler::{EventHandler, HandlerRegistry};
pub use projection::{CachedProjection, MergeOutcome, ProjectionStore, projection_key};
pub use redis_cache::RedisProjectionCache;
pub use worker::{ProjectionWorker, WorkerHandle};
