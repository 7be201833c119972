use uuid::Uuid;

use crate::event_sourcing::core::AggregateRoot;
use crate::event_sourcing::{CommandError, CommandHandler};

use super::aggregate::User;
use super::commands::UserCommand;
use super::errors::UserError;
use super::value_objects::Email;

// ============================================================================
// User Command Handler
// ============================================================================

pub type UserCommandHandler = CommandHandler<User>;

impl CommandHandler<User> {
    /// Register a user under a fresh id. When a name is given the profile
    /// update is appended in the same batch as the creation event.
    pub async fn register_user(
        &self,
        email: &str,
        username: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Uuid, CommandError<UserError>> {
        let user_id = Uuid::now_v7();
        let mut root = AggregateRoot::<User>::new(user_id);

        root.execute(
            &UserCommand::RegisterUser {
                email: Email::new(email),
                username: username.to_string(),
            },
            None,
        )
        .map_err(CommandError::Validation)?;

        if first_name.is_some() || last_name.is_some() {
            root.execute(
                &UserCommand::UpdateProfile {
                    first_name: first_name.map(str::to_string),
                    last_name: last_name.map(str::to_string),
                },
                None,
            )
            .map_err(CommandError::Validation)?;
        }

        let version = self.event_store().save(&mut root).await?;

        tracing::info!(user_id = %user_id, username = username, version = version, "User registered");
        Ok(user_id)
    }
}
