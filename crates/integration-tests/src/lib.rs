//! Test harness for FarmShare.
//!
//! Two kinds of tests live in this crate:
//!
//! - In-process router tests. [`TestApp`] builds the real router over an
//!   in-memory session store and points the backend client at an
//!   `httpmock` server, so no database or network is needed.
//! - Live tests against a running server (`#[ignore]`d). Start the site
//!   with `cargo run -p farmshare-web` and run them with
//!   `cargo test -p farmshare-integration-tests -- --ignored`.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Mutex;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use farmshare_web::config::{SupabaseConfig, WebConfig};
use farmshare_web::middleware::session::configure;
use farmshare_web::state::AppState;
use http_body_util::BodyExt;
use httpmock::MockServer;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

pub const USER_ID: &str = "0b5c7a57-2f5e-4c5e-9a3b-1d2e3f405162";
pub const FARMER_ID: &str = "5d4c3b2a-1908-4f7e-8d6c-5b4a39281706";
pub const USER_TOKEN: &str = "user-access-token";

/// Base URL of a running site for live tests.
#[must_use]
pub fn live_base_url() -> String {
    std::env::var("FARMSHARE_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// The router under test plus the mock backend it talks to.
pub struct TestApp {
    pub backend: MockServer,
    router: Router,
    cookie: Mutex<Option<String>>,
}

/// A response with its body read.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    /// Fresh app with an empty session store and a backend with no mocks.
    pub async fn spawn() -> Self {
        let backend = MockServer::start_async().await;
        let config = WebConfig {
            database_url: SecretString::from("postgres://farmshare@localhost:1/farmshare_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("k3Jq9vX2mPz8LwR4tYb6NcF1hGd5sAe7"),
            supabase: SupabaseConfig {
                url: Url::parse(&backend.base_url()).unwrap(),
                anon_key: SecretString::from("anon-key"),
                service_role_key: None,
            },
            listing_cache_ttl: Duration::from_secs(60),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://farmshare@localhost:1/farmshare_test")
            .unwrap();

        let state = AppState::new(config, pool);
        let router = farmshare_web::app(state, configure(MemoryStore::default(), false));
        Self {
            backend,
            router,
            cookie: Mutex::new(None),
        }
    }

    /// Send a request, carrying and updating the session cookie.
    pub async fn send(&self, mut request: Request<Body>) -> TestResponse {
        let cookie = self.cookie.lock().unwrap().clone();
        if let Some(cookie) = cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response: Response<Body> = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            *self.cookie.lock().unwrap() = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// POST a url-encoded form.
    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Mock a password sign-in for a `user` account and sign in.
    pub async fn sign_in(&self) {
        self.backend
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/auth/v1/token")
                    .query_param("grant_type", "password");
                then.status(200).json_body(json!({
                    "access_token": USER_TOKEN,
                    "expires_in": 3600,
                    "refresh_token": "refresh",
                    "user": {"id": USER_ID, "email": "asha@example.com"}
                }));
            })
            .await;
        self.mock_rows("/rest/v1/user_roles", json!([{"user_id": USER_ID, "role": "user"}]))
            .await;
        self.mock_rows(
            "/rest/v1/profiles",
            json!([{"id": USER_ID, "email": "asha@example.com", "full_name": "Asha Rao"}]),
        )
        .await;

        let response = self
            .post_form(
                "/auth/login",
                &[("email", "asha@example.com"), ("password", "correct horse")],
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
    }

    /// Answer every GET on `path` with `rows`.
    pub async fn mock_rows(&self, path: &str, rows: Value) -> httpmock::Mock<'_> {
        self.backend
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path(path);
                then.status(200).json_body(rows);
            })
            .await
    }
}

// =============================================================================
// Fixtures
// =============================================================================

#[must_use]
pub fn plot_row(id: &str, title: &str, location: &str, price: u32) -> Value {
    json!({
        "id": id,
        "farmer_id": FARMER_ID,
        "title": title,
        "location": location,
        "description": "Level ground near the canal",
        "soil_type": "Red loam",
        "total_area_sqft": 1200,
        "available_area_sqft": 1200,
        "price_per_sqft_monthly": price,
        "water_access": true,
        "amenities": ["Fenced"],
        "status": "active",
        "created_at": "2026-03-01T09:00:00Z",
        "profiles": {"full_name": "Ravi Kumar"}
    })
}

#[must_use]
pub fn produce_row(id: &str, name: &str, quantity: u32) -> Value {
    json!({
        "id": id,
        "farmer_id": FARMER_ID,
        "name": name,
        "category": "vegetables",
        "unit": "kg",
        "price_per_unit": 40,
        "quantity_available": quantity,
        "organic": true,
        "status": if quantity > 0 { "active" } else { "sold_out" },
        "created_at": "2026-03-02T09:00:00Z",
        "profiles": {"full_name": "Ravi Kumar"}
    })
}

#[must_use]
pub fn equipment_row(id: &str, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "vendor_id": FARMER_ID,
        "name": name,
        "category": "tools",
        "condition": "good",
        "location": "Mandya, Karnataka",
        "price_per_day": 500,
        "availability_status": status,
        "created_at": "2026-03-03T09:00:00Z"
    })
}

/// The one-time token from a rendered payment form.
#[must_use]
pub fn payment_token(html: &str) -> Option<String> {
    let start = html.find("name=\"token\" value=\"")? + "name=\"token\" value=\"".len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_token_extraction() {
        let html = r#"<input type="hidden" name="token" value="abc-123">"#;
        assert_eq!(payment_token(html).as_deref(), Some("abc-123"));
        assert_eq!(payment_token("<form></form>"), None);
    }
}
