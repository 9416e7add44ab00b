//! Authentication error types.

use farmshare_core::AppRole;
use thiserror::Error;

use crate::supabase::BackendError;

/// Errors that can occur during registration and sign-in.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] farmshare_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered with the identity provider.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Full name left blank.
    #[error("full name is required")]
    MissingName,

    /// No role picked on the registration form.
    #[error("role required")]
    RoleRequired,

    /// Role that can't be chosen at sign-up.
    #[error("role {0} cannot be chosen at registration")]
    RoleNotAllowed(AppRole),

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl AuthError {
    /// Message shown on the form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::UserAlreadyExists => "An account with this email already exists".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::MissingName => "Please enter your full name".to_string(),
            Self::RoleRequired => "Role required: please choose how you'll use FarmShare".to_string(),
            Self::RoleNotAllowed(_) => "Please choose hobbyist, landowner or vendor".to_string(),
            Self::Backend(err) => err.user_message(),
        }
    }

    /// Whether this is a server-side failure worth reporting.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::Http(_) | BackendError::Parse(_))
        )
    }
}
