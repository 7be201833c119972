use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// User Value Objects
// ============================================================================

/// User email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(pub String);

impl Email {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Basic shape check: non-blank and contains an `@`.
    pub fn is_plausible(&self) -> bool {
        let trimmed = self.0.trim();
        !trimmed.is_empty() && trimmed.contains('@')
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
