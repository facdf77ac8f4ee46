//! Command handlers for the Membership context.

use libris_core::aggregate::AggregateRoot;
use libris_core::clock::Clock;
use libris_core::command::Command;
use libris_core::error::DomainError;
use libris_core::event::DomainEvent;
use libris_core::event_store::StoredEvent;
use libris_core::repository::Repository;
use tracing::instrument;

use crate::domain::aggregates::User;
use crate::domain::commands::CreateUser;

/// Handles the `CreateUser` command: loads the user stream, records the
/// creation and saves it under the loaded version.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an existing user or invalid input,
/// and any error from loading or saving.
#[instrument(skip(clock, repo), fields(command_type = command.command_type()))]
pub async fn handle_create_user(
    command: &CreateUser,
    clock: &dyn Clock,
    repo: &Repository<User>,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut user = repo.get_by_id(command.user_id).await?;
    let expected_version = user.version();

    user.create(&command.name, &command.email, command.correlation_id, clock)?;

    let stored_events: Vec<StoredEvent> = user
        .uncommitted_events()
        .iter()
        .map(DomainEvent::to_stored)
        .collect();
    repo.save(&mut user, expected_version).await?;

    Ok(stored_events)
}
