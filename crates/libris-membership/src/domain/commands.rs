//! Commands for the Membership context.

use libris_core::command::Command;
use uuid::Uuid;

/// Command to register a user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Identifier chosen for the new user.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
}

impl Command for CreateUser {
    fn command_type(&self) -> &'static str {
        "membership.create_user"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target_aggregate_id(&self) -> Uuid {
        self.user_id
    }
}
