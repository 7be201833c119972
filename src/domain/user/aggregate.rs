use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event_sourcing::core::{Aggregate, EventEnvelope};
use super::commands::UserCommand;
use super::errors::UserError;
use super::events::*;
use super::value_objects::Email;

// ============================================================================
// User Aggregate - Business Logic
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<Email>,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_email_verified: bool,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_initialized(&self) -> bool {
        self.created_at.is_some()
    }

    fn validate_initialized(&self) -> Result<(), UserError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(UserError::NotInitialized)
        }
    }

    /// Validate email format (basic validation)
    fn validate_email(email: &Email) -> Result<(), UserError> {
        if email.as_str().trim().is_empty() {
            return Err(UserError::EmptyEmail);
        }
        if !email.is_plausible() {
            return Err(UserError::InvalidEmail(email.as_str().to_string()));
        }
        Ok(())
    }
}

impl Aggregate for User {
    type Event = UserEvent;
    type Command = UserCommand;
    type Error = UserError;

    fn aggregate_type() -> &'static str {
        "User"
    }

    fn apply(&mut self, envelope: &EventEnvelope<Self::Event>) {
        match &envelope.event_data {
            UserEvent::Created(e) => {
                self.user_id = envelope.aggregate_id;
                self.email = Some(e.email.clone());
                self.username = e.username.clone();
                self.created_at = Some(e.created_at);
                self.is_email_verified = false;
                self.is_active = true;
            }
            UserEvent::ProfileUpdated(e) => {
                self.first_name = e.first_name.clone();
                self.last_name = e.last_name.clone();
            }
            UserEvent::EmailVerified(_) => {
                self.is_email_verified = true;
            }
            UserEvent::LoggedIn(e) => {
                self.last_login_at = Some(e.login_at);
            }
            UserEvent::Deactivated(_) => {
                self.is_active = false;
            }
            UserEvent::Activated(_) => {
                self.is_active = true;
            }
        }
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let now = Utc::now();

        match command {
            UserCommand::RegisterUser { email, username } => {
                if self.is_initialized() {
                    return Err(UserError::AlreadyExists);
                }
                Self::validate_email(email)?;
                if username.trim().is_empty() {
                    return Err(UserError::EmptyUsername);
                }

                Ok(vec![UserEvent::Created(UserCreated {
                    email: email.clone(),
                    username: username.clone(),
                    created_at: now,
                })])
            }

            UserCommand::UpdateProfile { first_name, last_name } => {
                self.validate_initialized()?;

                Ok(vec![UserEvent::ProfileUpdated(UserProfileUpdated {
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    updated_at: now,
                })])
            }

            UserCommand::VerifyEmail => {
                self.validate_initialized()?;
                if self.is_email_verified {
                    return Ok(vec![]); // Already verified
                }
                let email = self.email.clone().ok_or(UserError::NotInitialized)?;

                Ok(vec![UserEvent::EmailVerified(UserEmailVerified { email, verified_at: now })])
            }

            UserCommand::RecordLogin => {
                self.validate_initialized()?;
                if !self.is_active {
                    return Err(UserError::NotActive);
                }

                Ok(vec![UserEvent::LoggedIn(UserLoggedIn { login_at: now })])
            }

            UserCommand::DeactivateUser => {
                self.validate_initialized()?;
                if !self.is_active {
                    return Ok(vec![]); // Already inactive
                }

                Ok(vec![UserEvent::Deactivated(UserDeactivated { deactivated_at: now })])
            }

            UserCommand::ActivateUser => {
                self.validate_initialized()?;
                if self.is_active {
                    return Ok(vec![]); // Already active
                }

                Ok(vec![UserEvent::Activated(UserActivated { activated_at: now })])
            }
        }
    }
}
