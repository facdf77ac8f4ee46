//! Command handlers for the Catalog context.
//!
//! Each handler loads the book through the repository, runs the domain
//! operation and saves the resulting events under the version it loaded.
//! A `ConcurrencyConflict` from the save is returned as is; the caller
//! decides whether to retry.

use libris_core::aggregate::AggregateRoot;
use libris_core::clock::Clock;
use libris_core::command::Command;
use libris_core::error::DomainError;
use libris_core::event::DomainEvent;
use libris_core::event_store::StoredEvent;
use libris_core::repository::Repository;
use tracing::instrument;

use crate::domain::aggregates::Book;
use crate::domain::commands::{ChangeBookAuthor, CreateBook, RenameBook};

async fn execute<C, F>(
    command: &C,
    repo: &Repository<Book>,
    operation: F,
) -> Result<Vec<StoredEvent>, DomainError>
where
    C: Command,
    F: FnOnce(&mut Book) -> Result<(), DomainError>,
{
    let mut book = repo.get_by_id(command.target_aggregate_id()).await?;
    let expected_version = book.version();

    operation(&mut book)?;

    let stored_events: Vec<StoredEvent> = book
        .uncommitted_events()
        .iter()
        .map(DomainEvent::to_stored)
        .collect();
    repo.save(&mut book, expected_version).await?;

    Ok(stored_events)
}

/// Handles the `CreateBook` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the book exists or the title is
/// blank, and any error from loading or saving.
#[instrument(skip(clock, repo), fields(command_type = command.command_type()))]
pub async fn handle_create_book(
    command: &CreateBook,
    clock: &dyn Clock,
    repo: &Repository<Book>,
) -> Result<Vec<StoredEvent>, DomainError> {
    execute(command, repo, |book| {
        book.create(&command.title, command.author_id, command.correlation_id, clock)
    })
    .await
}

/// Handles the `RenameBook` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the book does not exist,
/// `DomainError::Validation` for a blank title, and any error from loading
/// or saving.
#[instrument(skip(clock, repo), fields(command_type = command.command_type()))]
pub async fn handle_rename_book(
    command: &RenameBook,
    clock: &dyn Clock,
    repo: &Repository<Book>,
) -> Result<Vec<StoredEvent>, DomainError> {
    execute(command, repo, |book| {
        book.rename(&command.title, command.correlation_id, clock)
    })
    .await
}

/// Handles the `ChangeBookAuthor` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the book does not exist, and
/// any error from loading or saving.
#[instrument(skip(clock, repo), fields(command_type = command.command_type()))]
pub async fn handle_change_book_author(
    command: &ChangeBookAuthor,
    clock: &dyn Clock,
    repo: &Repository<Book>,
) -> Result<Vec<StoredEvent>, DomainError> {
    execute(command, repo, |book| {
        book.change_author(command.author_id, command.correlation_id, clock)
    })
    .await
}
