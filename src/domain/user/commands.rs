use super::value_objects::Email;

// ============================================================================
// User Domain Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum UserCommand {
    RegisterUser {
        email: Email,
        username: String,
    },
    UpdateProfile {
        first_name: Option<String>,
        last_name: Option<String>,
    },
    VerifyEmail,
    RecordLogin,
    DeactivateUser,
    ActivateUser,
}
