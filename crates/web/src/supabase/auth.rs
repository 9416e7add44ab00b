//! Sign-up, sign-in and sign-out against the backend's auth service.

use chrono::{DateTime, Duration, Utc};
use farmshare_core::{AppRole, ProfileId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{AccessToken, BackendError, SupabaseClient};

/// An authenticated user as returned by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: ProfileId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Metadata attached at sign-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<AppRole>,
}

/// A password-grant session.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Absolute expiry relative to `now`.
    #[must_use]
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.expires_in)
    }
}

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The user is signed in straight away.
    Session(AuthSession),
    /// The project requires email confirmation before sign-in.
    ConfirmationRequired(AuthUser),
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a UserMetadata,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

impl SupabaseClient {
    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is taken, the password is rejected, or
    /// the request fails.
    #[instrument(skip(self, password, metadata))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<SignUpOutcome, BackendError> {
        let builder = self
            .inner
            .http
            .post(self.auth_url("signup"))
            .json(&SignUpRequest {
                email,
                password,
                data: metadata,
            });
        let response = Self::send(self.authorize(builder, AccessToken::Anon)?).await?;
        let value: serde_json::Value = response.json().await?;
        parse_sign_up(value)
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are wrong or the request fails.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let builder = self
            .inner
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });
        let response = Self::send(self.authorize(builder, AccessToken::Anon)?).await?;
        Ok(response.json().await?)
    }

    /// Revoke an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let builder = self.inner.http.post(self.auth_url("logout"));
        Self::send(self.authorize(builder, AccessToken::User(access_token))?).await?;
        Ok(())
    }
}

/// Sign-up returns a session when auto-confirm is on, otherwise the bare user.
fn parse_sign_up(value: serde_json::Value) -> Result<SignUpOutcome, BackendError> {
    if value.get("access_token").is_some() {
        return Ok(SignUpOutcome::Session(serde_json::from_value(value)?));
    }
    if let Some(user) = value.get("user").filter(|u| !u.is_null()) {
        return Ok(SignUpOutcome::ConfirmationRequired(serde_json::from_value(
            user.clone(),
        )?));
    }
    Ok(SignUpOutcome::ConfirmationRequired(serde_json::from_value(
        value,
    )?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER_ID: &str = "0d4f5c1e-7a3b-4f55-8c2d-91b7e6a0c3f4";

    #[test]
    fn test_parse_sign_up_with_session() {
        let value = serde_json::json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": {
                "id": USER_ID,
                "email": "asha@example.com",
                "user_metadata": {"full_name": "Asha Rao", "role": "farmer"}
            }
        });
        let SignUpOutcome::Session(session) = parse_sign_up(value).unwrap() else {
            panic!("expected a session");
        };
        assert_eq!(session.user.user_metadata.role, Some(AppRole::Farmer));
        assert_eq!(session.access_token, "jwt");
    }

    #[test]
    fn test_parse_sign_up_requiring_confirmation() {
        let value = serde_json::json!({
            "id": USER_ID,
            "email": "asha@example.com",
            "user_metadata": {"full_name": "Asha Rao", "role": "vendor"}
        });
        let SignUpOutcome::ConfirmationRequired(user) = parse_sign_up(value).unwrap() else {
            panic!("expected confirmation");
        };
        assert_eq!(user.id.to_string(), USER_ID);
    }

    #[test]
    fn test_expires_at() {
        let now = Utc::now();
        let session = AuthSession {
            access_token: "jwt".to_string(),
            expires_in: 60,
            refresh_token: None,
            user: AuthUser {
                id: ProfileId::random(),
                email: None,
                user_metadata: UserMetadata::default(),
            },
        };
        assert_eq!(session.expires_at(now), now + Duration::seconds(60));
    }
}
