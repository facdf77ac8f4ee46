//! Aggregate roots for the Catalog context.

use libris_core::aggregate::AggregateRoot;
use libris_core::clock::Clock;
use libris_core::error::DomainError;
use libris_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{BookAuthorChanged, BookCreated, BookEvent, BookEventKind, BookRenamed};

/// The aggregate root for a catalogue book.
#[derive(Debug)]
pub struct Book {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Current title; `None` until the book is created.
    pub(crate) title: Option<String>,
    /// Current author; `None` until the book is created.
    pub(crate) author_id: Option<Uuid>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<BookEvent>,
}

impl Book {
    /// Returns `true` once a `BookCreated` event has been recorded or replayed.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.title.is_some()
            || self
                .uncommitted_events
                .iter()
                .any(|e| matches!(e.kind, BookEventKind::BookCreated(_)))
    }

    /// Current title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Current author.
    #[must_use]
    pub fn author_id(&self) -> Option<Uuid> {
        self.author_id
    }

    /// Adds the book to the catalogue, producing a `BookCreated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the book already exists or the
    /// title is blank.
    pub fn create(
        &mut self,
        title: &str,
        author_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.exists() {
            return Err(DomainError::Validation(format!(
                "book {} already exists",
                self.id
            )));
        }
        let title = require_title(title)?;
        self.record(
            BookEventKind::BookCreated(BookCreated {
                book_id: self.id,
                title,
                author_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Changes the title, producing a `BookRenamed` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the book was never created
    /// and `DomainError::Validation` if the title is blank.
    pub fn rename(
        &mut self,
        title: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_exists()?;
        let title = require_title(title)?;
        self.record(
            BookEventKind::BookRenamed(BookRenamed {
                book_id: self.id,
                title,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Credits the book to another author, producing a `BookAuthorChanged`
    /// event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the book was never created.
    pub fn change_author(
        &mut self,
        author_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_exists()?;
        self.record(
            BookEventKind::BookAuthorChanged(BookAuthorChanged {
                book_id: self.id,
                author_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    fn require_exists(&self) -> Result<(), DomainError> {
        if self.exists() {
            Ok(())
        } else {
            Err(DomainError::AggregateNotFound(self.id))
        }
    }

    fn record(&mut self, kind: BookEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = BookEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }
}

fn require_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::Validation("title must not be blank".to_owned()));
    }
    Ok(title.to_owned())
}

impl AggregateRoot for Book {
    type Event = BookEvent;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            title: None,
            author_id: None,
            uncommitted_events: Vec::new(),
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            BookEventKind::BookCreated(payload) => {
                self.title = Some(payload.title.clone());
                self.author_id = Some(payload.author_id);
            }
            BookEventKind::BookRenamed(payload) => {
                self.title = Some(payload.title.clone());
            }
            BookEventKind::BookAuthorChanged(payload) => {
                self.author_id = Some(payload.author_id);
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn mark_committed(&mut self) {
        for event in std::mem::take(&mut self.uncommitted_events) {
            self.apply(&event);
        }
    }
}
