//! Explicit wiring of the write side and the read side.
//!
//! [`Backends`] names the four pieces of infrastructure (one event store per
//! aggregate family, the bus, and the projection cache). [`compose`] wraps
//! each store so that committed events are published, then builds the
//! repositories, the projection store and the read-model facades on top.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use libris_bus::{InMemoryEventBus, RedisEventBus};
use libris_catalog::application::event_handlers::{
    AUTHOR_PROJECTION as CATALOG_AUTHOR_PROJECTION, AuthorSummary, BOOK_PROJECTION,
    BookAuthorChangedProjection, BookCreatedNotification, BookCreatedProjection,
    BookRenamedProjection, BookView,
};
use libris_catalog::domain::aggregates::Book;
use libris_core::bus::EventBus;
use libris_core::clock::{Clock, SystemClock};
use libris_core::event_store::EventStore;
use libris_core::repository::Repository;
use libris_event_store::{InMemoryEventStore, PgEventStore, PublishingEventStore};
use libris_membership::application::event_handlers::{
    AUTHOR_PROJECTION, AuthorCreatedProjection, AuthorView, USER_PROJECTION, UserCreatedProjection,
    UserView,
};
use libris_membership::domain::aggregates::User;
use libris_read_model::{
    EventDispatcher, HandlerRegistry, InMemoryProjectionCache, ProjectionCache, ProjectionStore,
    ProjectionWorker, ReadModelFacade, RedisProjectionCache, WorkerHandle,
};

use crate::config::AppConfig;
use crate::error::AppError;

/// The infrastructure the services are composed from.
pub struct Backends {
    /// Event log for the `Book` family.
    pub book_store: Arc<dyn EventStore>,
    /// Event log for the `User` family.
    pub user_store: Arc<dyn EventStore>,
    /// Broadcast channel for committed events.
    pub bus: Arc<dyn EventBus>,
    /// Key/value store holding the projections.
    pub cache: Arc<dyn ProjectionCache>,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

impl Backends {
    /// Process-local backends: in-memory stores, a broadcast bus and an
    /// in-memory cache.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            book_store: Arc::new(InMemoryEventStore::new()),
            user_store: Arc::new(InMemoryEventStore::new()),
            bus: Arc::new(InMemoryEventBus::default()),
            cache: Arc::new(InMemoryProjectionCache::new()),
        }
    }

    /// Connects to PostgreSQL and Redis and applies the event-store schema.
    ///
    /// Both families share one pool and one `domain_events` table; their
    /// streams never collide because stream ids are UUIDs.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the pool cannot connect,
    /// `AppError::Migration` if the schema cannot be applied, and
    /// `AppError::Redis` if the broker or cache is unreachable.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        let store = PgEventStore::new(pool).with_append_timeout(config.append_timeout);
        store
            .migrate()
            .await
            .map_err(|e| AppError::Migration(e.to_string()))?;
        info!("event store schema is up to date");

        let bus = RedisEventBus::connect(&config.redis_url)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        let cache = RedisProjectionCache::connect(&config.redis_url)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        info!("connected to redis");

        Ok(Self {
            book_store: Arc::new(store.clone()),
            user_store: Arc::new(store),
            bus: Arc::new(bus),
            cache: Arc::new(cache),
        })
    }
}

/// Repositories, projections and facades ready for use.
#[derive(Clone)]
pub struct Services {
    /// Timestamp source for new events.
    pub clock: Arc<dyn Clock>,
    /// The bus committed events are published on.
    pub bus: Arc<dyn EventBus>,
    /// Repository for `Book` aggregates.
    pub books: Repository<Book>,
    /// Repository for `User` aggregates.
    pub users: Repository<User>,
    /// Shared writer for every projection.
    pub projections: Arc<ProjectionStore>,
    /// Reads `books:<id>`.
    pub book_views: ReadModelFacade<BookView>,
    /// Reads `users:<id>`.
    pub user_views: ReadModelFacade<UserView>,
    /// Reads `authors:<id>`.
    pub author_views: ReadModelFacade<AuthorView>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("books", &self.books)
            .field("users", &self.users)
            .finish_non_exhaustive()
    }
}

/// Builds the services from `backends`.
///
/// Every store is wrapped in a [`PublishingEventStore`] on the shared bus, so
/// a successful save is followed by one publish per event, in order.
#[must_use]
pub fn compose(backends: Backends, clock: Arc<dyn Clock>) -> Services {
    let Backends {
        book_store,
        user_store,
        bus,
        cache,
    } = backends;

    let book_store: Arc<dyn EventStore> =
        Arc::new(PublishingEventStore::new(book_store, Arc::clone(&bus)));
    let user_store: Arc<dyn EventStore> =
        Arc::new(PublishingEventStore::new(user_store, Arc::clone(&bus)));

    Services {
        clock,
        bus,
        books: Repository::new(book_store),
        users: Repository::new(user_store),
        projections: Arc::new(ProjectionStore::new(Arc::clone(&cache))),
        book_views: ReadModelFacade::new(Arc::clone(&cache), BOOK_PROJECTION),
        user_views: ReadModelFacade::new(Arc::clone(&cache), USER_PROJECTION),
        author_views: ReadModelFacade::new(cache, AUTHOR_PROJECTION),
    }
}

impl Services {
    /// Fully in-memory services on the system clock.
    #[must_use]
    pub fn in_memory() -> Self {
        compose(Backends::in_memory(), Arc::new(SystemClock))
    }

    /// Every projection and notification handler, in dispatch order.
    #[must_use]
    pub fn handler_registry(&self) -> HandlerRegistry {
        let authors: ReadModelFacade<AuthorSummary> =
            ReadModelFacade::new(self.projections.cache(), CATALOG_AUTHOR_PROJECTION);

        HandlerRegistry::new(Vec::new())
            .with(Arc::new(BookCreatedProjection::new(Arc::clone(
                &self.projections,
            ))))
            .with(Arc::new(BookCreatedNotification))
            .with(Arc::new(BookRenamedProjection::new(Arc::clone(
                &self.projections,
            ))))
            .with(Arc::new(BookAuthorChangedProjection::new(
                Arc::clone(&self.projections),
                authors,
            )))
            .with(Arc::new(UserCreatedProjection::new(Arc::clone(
                &self.projections,
            ))))
            .with(Arc::new(AuthorCreatedProjection::new(Arc::clone(
                &self.projections,
            ))))
    }

    /// Subscribes to every handled event kind and starts dispatching.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Subscription` if the bus refuses the subscription.
    pub async fn start_projector(&self) -> Result<WorkerHandle, AppError> {
        let dispatcher = EventDispatcher::new(self.handler_registry());
        let worker = ProjectionWorker::start(Arc::clone(&self.bus), dispatcher).await?;
        Ok(worker)
    }
}
