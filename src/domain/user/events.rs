use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_family;
use crate::event_sourcing::core::DomainEvent;
use super::value_objects::Email;

// ============================================================================
// User Domain Events
// ============================================================================

/// Union type for all user events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserEvent {
    Created(UserCreated),
    ProfileUpdated(UserProfileUpdated),
    EmailVerified(UserEmailVerified),
    LoggedIn(UserLoggedIn),
    Deactivated(UserDeactivated),
    Activated(UserActivated),
}

event_family!(UserEvent {
    Created(UserCreated),
    ProfileUpdated(UserProfileUpdated),
    EmailVerified(UserEmailVerified),
    LoggedIn(UserLoggedIn),
    Deactivated(UserDeactivated),
    Activated(UserActivated),
});

// Individual event types

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreated {
    pub email: Email,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl DomainEvent for UserCreated {
    fn event_type() -> &'static str { "UserCreated" }
}

/// Replaces both names; `None` clears a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfileUpdated {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl DomainEvent for UserProfileUpdated {
    fn event_type() -> &'static str { "UserProfileUpdated" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEmailVerified {
    pub email: Email,
    pub verified_at: DateTime<Utc>,
}

impl DomainEvent for UserEmailVerified {
    fn event_type() -> &'static str { "UserEmailVerified" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLoggedIn {
    pub login_at: DateTime<Utc>,
}

impl DomainEvent for UserLoggedIn {
    fn event_type() -> &'static str { "UserLoggedIn" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDeactivated {
    pub deactivated_at: DateTime<Utc>,
}

impl DomainEvent for UserDeactivated {
    fn event_type() -> &'static str { "UserDeactivated" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActivated {
    pub activated_at: DateTime<Utc>,
}

impl DomainEvent for UserActivated {
    fn event_type() -> &'static str { "UserActivated" }
}
