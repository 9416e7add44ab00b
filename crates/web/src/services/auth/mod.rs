//! Authentication service.
//!
//! Identity lives with the backend's auth provider. This service adds the
//! marketplace's side of an account: a `profiles` row and a `user_roles`
//! row, written with the new user's own token so row-level policies apply.

mod error;

pub use error::AuthError;

use chrono::Utc;
use tracing::instrument;

use farmshare_core::{AppRole, Email};

use crate::models::CurrentUser;
use crate::supabase::{
    AccessToken, AuthSession, BackendError, NewProfile, PROFILES, Profile, Query, SignUpOutcome,
    SupabaseClient, USER_ROLES, UserMetadata, UserRoleRow,
};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form input, unvalidated.
#[derive(Debug, Clone, Copy)]
pub struct RegisterInput<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    /// `None` or empty when no role was picked.
    pub role: Option<&'a str>,
}

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    /// Account created and signed in.
    SignedIn(CurrentUser),
    /// Account created; the provider wants the email confirmed first.
    ConfirmationRequired(Email),
}

/// Authentication service.
pub struct AuthService<'a> {
    backend: &'a SupabaseClient,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(backend: &'a SupabaseClient) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a new account with a marketplace role.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, invalid email, short
    /// password or missing role; `UserAlreadyExists` if the email is taken;
    /// otherwise the backend error.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput<'_>) -> Result<RegisterOutcome, AuthError> {
        let full_name = input.full_name.trim();
        if full_name.is_empty() {
            return Err(AuthError::MissingName);
        }
        let email = Email::parse(input.email)?;
        validate_password(input.password)?;
        let role = parse_role(input.role)?;

        let metadata = UserMetadata {
            full_name: Some(full_name.to_string()),
            role: Some(role),
        };
        let outcome = self
            .backend
            .sign_up(email.as_str(), input.password, &metadata)
            .await
            .map_err(map_sign_up_error)?;

        match outcome {
            SignUpOutcome::Session(session) => {
                self.provision(&session, &email, full_name, role).await?;
                tracing::info!(user_id = %session.user.id, role = %role, "Account registered");
                Ok(RegisterOutcome::SignedIn(current_user(
                    &session, email, full_name, role,
                )))
            }
            SignUpOutcome::ConfirmationRequired(user) => {
                tracing::info!(user_id = %user.id, "Account registered, awaiting confirmation");
                Ok(RegisterOutcome::ConfirmationRequired(email))
            }
        }
    }

    // =========================================================================
    // Sign-in / sign-out
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// Accounts confirmed by email have no marketplace rows yet; they are
    /// created here from the metadata given at sign-up.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for a wrong email or password, otherwise
    /// the backend error.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let session = self
            .backend
            .sign_in_with_password(email.as_str(), password)
            .await
            .map_err(|e| match e {
                BackendError::Api { status: 400, .. } | BackendError::Unauthorized(_) => {
                    AuthError::InvalidCredentials
                }
                other => AuthError::Backend(other),
            })?;

        let token = AccessToken::User(&session.access_token);
        let user_id = session.user.id;
        let roles: Vec<UserRoleRow> = self
            .backend
            .select(&Query::table(USER_ROLES).eq("user_id", user_id), token)
            .await?;
        let profile: Option<Profile> = self
            .backend
            .select(&Query::table(PROFILES).eq("id", user_id), token)
            .await?
            .into_iter()
            .next();

        let metadata = &session.user.user_metadata;
        let full_name = profile
            .map(|p| p.full_name)
            .or_else(|| metadata.full_name.clone())
            .unwrap_or_else(|| email.as_str().split('@').next().unwrap_or_default().to_string());

        let role = if let Some(row) = roles.first() {
            row.role
        } else {
            let role = metadata.role.unwrap_or_default();
            self.provision(&session, &email, &full_name, role).await?;
            role
        };

        tracing::info!(user_id = %user_id, role = %role, "Signed in");
        Ok(current_user(&session, email, &full_name, role))
    }

    /// Revoke the user's token. Failures are logged; the local session is
    /// cleared regardless.
    pub async fn sign_out(&self, user: &CurrentUser) {
        if let Err(e) = self.backend.sign_out(&user.access_token).await {
            tracing::warn!(error = %e, user_id = %user.id, "Token revocation failed");
        }
    }

    /// Write the `profiles` and `user_roles` rows for a new account.
    ///
    /// A profile created by a backend trigger shows up as a conflict and is
    /// left as is.
    async fn provision(
        &self,
        session: &AuthSession,
        email: &Email,
        full_name: &str,
        role: AppRole,
    ) -> Result<(), BackendError> {
        let token = AccessToken::User(&session.access_token);
        let profile = NewProfile {
            id: session.user.id,
            email: email.as_str(),
            full_name,
        };
        ignore_conflict(
            self.backend
                .insert::<_, serde_json::Value>(PROFILES, &profile, token)
                .await,
        )?;

        let role_row = UserRoleRow {
            user_id: session.user.id,
            role,
        };
        ignore_conflict(
            self.backend
                .insert::<_, serde_json::Value>(USER_ROLES, &role_row, token)
                .await,
        )
    }
}

fn current_user(session: &AuthSession, email: Email, full_name: &str, role: AppRole) -> CurrentUser {
    CurrentUser {
        id: session.user.id,
        email,
        full_name: full_name.to_string(),
        role,
        access_token: session.access_token.clone(),
        expires_at: session.expires_at(Utc::now()),
    }
}

fn ignore_conflict(result: Result<serde_json::Value, BackendError>) -> Result<(), BackendError> {
    match result {
        Ok(_) | Err(BackendError::Api { status: 409, .. }) => Ok(()),
        Err(e) => Err(e),
    }
}

fn map_sign_up_error(err: BackendError) -> AuthError {
    match err {
        BackendError::Api { status: 400 | 422, ref message }
            if message.to_ascii_lowercase().contains("already") =>
        {
            AuthError::UserAlreadyExists
        }
        BackendError::Api { status: 422, message } => AuthError::WeakPassword(message),
        other => AuthError::Backend(other),
    }
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Parse the role picked at registration. Admins are never self-service.
fn parse_role(raw: Option<&str>) -> Result<AppRole, AuthError> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty());
    let role: AppRole = raw
        .ok_or(AuthError::RoleRequired)?
        .parse()
        .map_err(|_| AuthError::RoleRequired)?;
    if AppRole::SELF_SERVICE.contains(&role) {
        Ok(role)
    } else {
        Err(AuthError::RoleNotAllowed(role))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(Some("farmer")).unwrap(), AppRole::Farmer);
        assert!(matches!(parse_role(None), Err(AuthError::RoleRequired)));
        assert!(matches!(parse_role(Some("  ")), Err(AuthError::RoleRequired)));
        assert!(matches!(
            parse_role(Some("admin")),
            Err(AuthError::RoleNotAllowed(AppRole::Admin))
        ));
    }

    #[test]
    fn test_sign_up_error_mapping() {
        let taken = BackendError::Api {
            status: 422,
            message: "User already registered".to_string(),
        };
        assert!(matches!(map_sign_up_error(taken), AuthError::UserAlreadyExists));

        let weak = BackendError::Api {
            status: 422,
            message: "Password should contain a digit".to_string(),
        };
        assert!(matches!(map_sign_up_error(weak), AuthError::WeakPassword(_)));
    }

    #[test]
    fn test_conflict_is_not_an_error() {
        let conflict = Err(BackendError::Api {
            status: 409,
            message: "duplicate key value".to_string(),
        });
        assert!(ignore_conflict(conflict).is_ok());
    }
}
