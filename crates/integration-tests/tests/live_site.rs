//! Smoke tests against a running FarmShare server.
//!
//! These tests require:
//! - The site running (cargo run -p farmshare-web)
//! - A reachable backend project with the marketplace tables
//!
//! Run with: cargo test -p farmshare-integration-tests -- --ignored

use farmshare_integration_tests::live_base_url;
use reqwest::{Client, StatusCode, redirect::Policy};

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_live_health() {
    let resp = client()
        .get(format!("{}/health", live_base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running server and session database"]
async fn test_live_readiness() {
    let resp = client()
        .get(format!("{}/health/ready", live_base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and backend project"]
async fn test_live_public_pages_render() {
    let client = client();
    for path in ["/", "/browse", "/equipment", "/marketplace", "/cart", "/auth/login"] {
        let resp = client
            .get(format!("{}{path}", live_base_url()))
            .send()
            .await
            .expect("Failed to reach server");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        let body = resp.text().await.expect("Failed to read body");
        assert!(body.contains("FarmShare"), "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_live_dashboard_requires_sign_in() {
    let resp = client()
        .get(format!("{}/dashboard", live_base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/auth/login")
    );
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_live_cart_session_persists() {
    let client = client();
    let base = live_base_url();

    let first = client
        .get(format!("{base}/cart/count"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(first.status(), StatusCode::OK);

    let cleared = client
        .post(format!("{base}/cart/clear"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(cleared.status(), StatusCode::SEE_OTHER);

    let count = client
        .get(format!("{base}/cart/count"))
        .send()
        .await
        .expect("Failed to reach server")
        .text()
        .await
        .expect("Failed to read body");
    assert!(count.contains(">0<"));
}
