// ============================================================================
// User Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UserError {
    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("User already exists")]
    AlreadyExists,

    #[error("User must be active to perform this operation")]
    NotActive,

    #[error("Aggregate not initialized")]
    NotInitialized,
}
