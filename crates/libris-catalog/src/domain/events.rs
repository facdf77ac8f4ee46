//! Domain events for the Catalog context.

use libris_core::error::DomainError;
use libris_core::event::{DomainEvent, EventMetadata, decode_payload};
use libris_core::event_store::StoredEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of [`BookCreated`].
pub const BOOK_CREATED: &str = "catalog.book_created";
/// Kind of [`BookRenamed`].
pub const BOOK_RENAMED: &str = "catalog.book_renamed";
/// Kind of [`BookAuthorChanged`].
pub const BOOK_AUTHOR_CHANGED: &str = "catalog.book_author_changed";

/// Emitted when a book is added to the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCreated {
    /// The book identifier.
    pub book_id: Uuid,
    /// The book title.
    pub title: String,
    /// The user credited as author.
    pub author_id: Uuid,
}

/// Emitted when a book's title changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRenamed {
    /// The book identifier.
    pub book_id: Uuid,
    /// The new title.
    pub title: String,
}

/// Emitted when a book is credited to a different author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookAuthorChanged {
    /// The book identifier.
    pub book_id: Uuid,
    /// The new author.
    pub author_id: Uuid,
}

/// Event payload variants for the Catalog context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookEventKind {
    /// A book was created.
    BookCreated(BookCreated),
    /// A book was renamed.
    BookRenamed(BookRenamed),
    /// A book's author changed.
    BookAuthorChanged(BookAuthorChanged),
}

impl BookEventKind {
    /// The canonical kind name, also used as the bus channel.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::BookCreated(_) => BOOK_CREATED,
            Self::BookRenamed(_) => BOOK_RENAMED,
            Self::BookAuthorChanged(_) => BOOK_AUTHOR_CHANGED,
        }
    }
}

/// Domain event envelope for the Catalog context.
#[derive(Debug, Clone)]
pub struct BookEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: BookEventKind,
}

impl DomainEvent for BookEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("BookEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind: decode_payload(stored)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_test_support::make_stored_event;

    #[test]
    fn test_from_stored_round_trips_payload_and_metadata() {
        // Arrange
        let book_id = Uuid::new_v4();
        let kind = BookEventKind::BookRenamed(BookRenamed {
            book_id,
            title: "Dune Messiah".to_owned(),
        });
        let stored = make_stored_event(
            book_id,
            BOOK_RENAMED,
            serde_json::to_value(&kind).unwrap(),
            2,
        );

        // Act
        let event = BookEvent::from_stored(&stored).unwrap();

        // Assert
        assert_eq!(event.kind, kind);
        assert_eq!(event.event_type(), BOOK_RENAMED);
        assert_eq!(event.metadata.sequence_number, 2);
        assert_eq!(event.to_stored(), stored);
    }

    #[test]
    fn test_from_stored_rejects_foreign_payload() {
        let stored = make_stored_event(
            Uuid::new_v4(),
            BOOK_RENAMED,
            serde_json::json!({"Unknown": {}}),
            1,
        );

        let result = BookEvent::from_stored(&stored);

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
