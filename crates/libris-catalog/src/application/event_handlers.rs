//! Event handlers maintaining the book projection.
//!
//! Books are cached under `books:<book_id>`. The author is denormalized into
//! the book document from the `authors:<user_id>` projection kept by the
//! Membership context.

use std::sync::Arc;

use async_trait::async_trait;
use libris_core::event::DomainEvent;
use libris_core::event_store::StoredEvent;
use libris_read_model::{
    EventHandler, HandlerError, MergeOutcome, ProjectionStore, ReadModelFacade, projection_key,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::events::{
    BOOK_AUTHOR_CHANGED, BOOK_CREATED, BOOK_RENAMED, BookEvent, BookEventKind,
};

/// Entity kind of the book projection.
pub const BOOK_PROJECTION: &str = "books";
/// Entity kind of the author projection this context reads.
pub const AUTHOR_PROJECTION: &str = "authors";

/// The author fields embedded in a book document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    /// The author's user id.
    pub author_id: Uuid,
    /// Display name.
    pub name: String,
}

/// Read-only view of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    /// The book identifier.
    pub book_id: Uuid,
    /// Current title.
    pub title: String,
    /// Current author.
    pub author_id: Uuid,
    /// Author details, filled in when the author is changed.
    #[serde(default)]
    pub author: Option<AuthorSummary>,
}

fn decode(event: &StoredEvent) -> Result<BookEventKind, HandlerError> {
    BookEvent::from_stored(event)
        .map(|e| e.kind)
        .map_err(|e| HandlerError::Decode(e.to_string()))
}

fn unexpected(event: &StoredEvent) -> HandlerError {
    HandlerError::Decode(format!(
        "payload of {} does not match its kind",
        event.event_type
    ))
}

fn log_outcome(handler: &'static str, event: &StoredEvent, outcome: MergeOutcome) {
    debug!(
        handler,
        book_id = %event.aggregate_id,
        sequence_number = event.sequence_number,
        ?outcome,
        "book projection updated"
    );
}

/// Writes the initial book document on `catalog.book_created`.
#[derive(Debug)]
pub struct BookCreatedProjection {
    projections: Arc<ProjectionStore>,
}

impl BookCreatedProjection {
    /// Creates the handler.
    #[must_use]
    pub fn new(projections: Arc<ProjectionStore>) -> Self {
        Self { projections }
    }
}

#[async_trait]
impl EventHandler for BookCreatedProjection {
    fn name(&self) -> &'static str {
        "book_created_projection"
    }

    fn event_type(&self) -> &'static str {
        BOOK_CREATED
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), HandlerError> {
        let BookEventKind::BookCreated(created) = decode(event)? else {
            return Err(unexpected(event));
        };
        let view = BookView {
            book_id: created.book_id,
            title: created.title,
            author_id: created.author_id,
            author: None,
        };
        let outcome = self
            .projections
            .create(&projection_key(BOOK_PROJECTION, created.book_id), event, view)
            .await?;
        log_outcome(self.name(), event, outcome);
        Ok(())
    }
}

/// Updates the title on `catalog.book_renamed`.
#[derive(Debug)]
pub struct BookRenamedProjection {
    projections: Arc<ProjectionStore>,
}

impl BookRenamedProjection {
    /// Creates the handler.
    #[must_use]
    pub fn new(projections: Arc<ProjectionStore>) -> Self {
        Self { projections }
    }
}

#[async_trait]
impl EventHandler for BookRenamedProjection {
    fn name(&self) -> &'static str {
        "book_renamed_projection"
    }

    fn event_type(&self) -> &'static str {
        BOOK_RENAMED
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), HandlerError> {
        let BookEventKind::BookRenamed(renamed) = decode(event)? else {
            return Err(unexpected(event));
        };
        let outcome = self
            .projections
            .merge(
                &projection_key(BOOK_PROJECTION, renamed.book_id),
                event,
                |view: &mut BookView| view.title = renamed.title,
            )
            .await?;
        log_outcome(self.name(), event, outcome);
        Ok(())
    }
}

/// Replaces the author on `catalog.book_author_changed`, embedding the
/// author's cached projection.
#[derive(Debug)]
pub struct BookAuthorChangedProjection {
    projections: Arc<ProjectionStore>,
    authors: ReadModelFacade<AuthorSummary>,
}

impl BookAuthorChangedProjection {
    /// Creates the handler.
    #[must_use]
    pub fn new(projections: Arc<ProjectionStore>, authors: ReadModelFacade<AuthorSummary>) -> Self {
        Self {
            projections,
            authors,
        }
    }
}

#[async_trait]
impl EventHandler for BookAuthorChangedProjection {
    fn name(&self) -> &'static str {
        "book_author_changed_projection"
    }

    fn event_type(&self) -> &'static str {
        BOOK_AUTHOR_CHANGED
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), HandlerError> {
        let BookEventKind::BookAuthorChanged(changed) = decode(event)? else {
            return Err(unexpected(event));
        };
        let key = projection_key(BOOK_PROJECTION, changed.book_id);
        if self.projections.load::<BookView>(&key).await?.is_none() {
            log_outcome(self.name(), event, MergeOutcome::Missing);
            return Ok(());
        }

        // An author not projected yet still moves the book to the new id;
        // the summary stays empty rather than keeping the previous author's.
        let author = match self.authors.get_by_id(changed.author_id).await {
            Ok(cached) => Some(cached.view),
            Err(e) if e.is_miss() => {
                debug!(author_id = %changed.author_id, "author not projected yet");
                None
            }
            Err(e) => return Err(e.into()),
        };
        let outcome = self
            .projections
            .merge(&key, event, |view: &mut BookView| {
                view.author_id = changed.author_id;
                view.author = author;
            })
            .await?;
        log_outcome(self.name(), event, outcome);
        Ok(())
    }
}

/// Announces new books. Has no projection of its own.
#[derive(Debug, Default)]
pub struct BookCreatedNotification;

#[async_trait]
impl EventHandler for BookCreatedNotification {
    fn name(&self) -> &'static str {
        "book_created_notification"
    }

    fn event_type(&self) -> &'static str {
        BOOK_CREATED
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), HandlerError> {
        let BookEventKind::BookCreated(created) = decode(event)? else {
            return Err(unexpected(event));
        };
        info!(
            book_id = %created.book_id,
            title = %created.title,
            author_id = %created.author_id,
            "new book in the catalogue"
        );
        Ok(())
    }
}
