//! Commands for the Catalog context.

use libris_core::command::Command;
use uuid::Uuid;

/// Command to add a book to the catalogue.
#[derive(Debug, Clone)]
pub struct CreateBook {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Identifier chosen for the new book.
    pub book_id: Uuid,
    /// The book title.
    pub title: String,
    /// The user credited as author.
    pub author_id: Uuid,
}

/// Command to change a book's title.
#[derive(Debug, Clone)]
pub struct RenameBook {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The book to rename.
    pub book_id: Uuid,
    /// The new title.
    pub title: String,
}

/// Command to credit a book to another author.
#[derive(Debug, Clone)]
pub struct ChangeBookAuthor {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The book to update.
    pub book_id: Uuid,
    /// The new author.
    pub author_id: Uuid,
}

impl Command for CreateBook {
    fn command_type(&self) -> &'static str {
        "catalog.create_book"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target_aggregate_id(&self) -> Uuid {
        self.book_id
    }
}

impl Command for RenameBook {
    fn command_type(&self) -> &'static str {
        "catalog.rename_book"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target_aggregate_id(&self) -> Uuid {
        self.book_id
    }
}

impl Command for ChangeBookAuthor {
    fn command_type(&self) -> &'static str {
        "catalog.change_book_author"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target_aggregate_id(&self) -> Uuid {
        self.book_id
    }
}
