//! Client for the managed backend (Supabase).
//!
//! # Architecture
//!
//! - The backend is the system of record; nothing is synced locally
//! - Table reads/writes go through the REST (`PostgREST`) interface
//! - Sign-up/sign-in go through the auth (`GoTrue`) interface
//! - Anonymous listing reads are cached via `moka`; writes invalidate by table
//!
//! Every request carries the project's `apikey` plus a bearer token. Calls
//! made on behalf of a signed-in user pass their access token so the
//! backend's row-level policies apply to them.
//!
//! # Example
//!
//! ```rust,ignore
//! use farmshare_web::supabase::{AccessToken, Query, SupabaseClient};
//!
//! let client = SupabaseClient::new(&config.supabase, config.listing_cache_ttl);
//! let plots: Vec<LandListing> = client
//!     .select(&Query::table("land_listings").eq("status", "active"), AccessToken::Anon)
//!     .await?;
//! ```

mod auth;
mod cache;
mod rest;
pub mod types;

pub use auth::{AuthSession, AuthUser, SignUpOutcome, UserMetadata};
pub use rest::Query;
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::config::SupabaseConfig;
use cache::ListingCache;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request.
    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Row not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials missing, expired or not allowed by row-level policy.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl BackendError {
    /// Message safe to show to the visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Unauthorized(message) => message.clone(),
            Self::NotFound(_) => "That item no longer exists".to_string(),
            Self::RateLimited(_) => "Too many requests, please wait a moment".to_string(),
            Self::Http(_) | Self::Parse(_) => "The service is unavailable, please try again".to_string(),
        }
    }
}

/// Which credential a request runs as.
#[derive(Debug, Clone, Copy)]
pub enum AccessToken<'a> {
    /// Public anon key; row-level policies see an anonymous visitor.
    Anon,
    /// A signed-in user's access token.
    User(&'a str),
    /// Service role key; bypasses row-level policies.
    ServiceRole,
}

/// Client for the managed backend.
///
/// Cheap to clone; all clones share one HTTP connection pool and cache.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    http: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    service_role_key: Option<SecretString>,
    cache: ListingCache,
}

impl SupabaseClient {
    /// Create a client. `cache_ttl` bounds how stale anonymous listing reads
    /// may be.
    #[must_use]
    pub fn new(config: &SupabaseConfig, cache_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(SupabaseClientInner {
                http: reqwest::Client::new(),
                base_url: trim_base(&config.url),
                anon_key: config.anon_key.clone(),
                service_role_key: config.service_role_key.clone(),
                cache: ListingCache::new(cache_ttl),
            }),
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.inner.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.inner.base_url)
    }

    /// Attach `apikey` and `Authorization` headers for `token`.
    fn authorize(
        &self,
        builder: RequestBuilder,
        token: AccessToken<'_>,
    ) -> Result<RequestBuilder, BackendError> {
        let anon = self.inner.anon_key.expose_secret();
        let (apikey, bearer) = match token {
            AccessToken::Anon => (anon, anon),
            AccessToken::User(access_token) => (anon, access_token),
            AccessToken::ServiceRole => {
                let key = self
                    .inner
                    .service_role_key
                    .as_ref()
                    .ok_or_else(|| {
                        BackendError::Unauthorized(
                            "SUPABASE_SERVICE_ROLE_KEY is not configured".to_string(),
                        )
                    })?
                    .expose_secret();
                (key, key)
            }
        };

        Ok(builder
            .header("apikey", apikey)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {bearer}")))
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Backend returned non-success status"
        );

        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
            StatusCode::NOT_FOUND => BackendError::NotFound(message),
            _ => BackendError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

fn trim_base(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

/// Pull a human-readable message out of a REST or auth error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key)?.as_str())
        .map(str::to_string)
}
