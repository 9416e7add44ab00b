//! In-process tests of the public pages, the cart and the auth gates.
//!
//! The backend is an `httpmock` server; sessions live in memory.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use farmshare_integration_tests::{TestApp, equipment_row, plot_row, produce_row};
use serde_json::json;

const PLOT_A: &str = "9a8b7c6d-5e4f-4a3b-9c2d-1e0f1a2b3c4d";
const PLOT_B: &str = "1f2e3d4c-5b6a-4978-8695-a4b3c2d1e0f9";
const TOMATOES: &str = "3c2b1a09-8f7e-4d6c-a5b4-3c2d1e0f9a8b";
const MANGOES: &str = "7e6d5c4b-3a29-4817-b6f5-e4d3c2b1a090";
const TILLER: &str = "2a3b4c5d-6e7f-4801-9a2b-3c4d5e6f7081";
const SPRAYER: &str = "6c5d4e3f-2a1b-4c0d-9e8f-7a6b5c4d3e2f";

// ============================================================================
// Health & Headers
// ============================================================================

#[tokio::test]
async fn test_health_carries_security_headers() {
    let app = TestApp::spawn().await;
    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
    assert!(response.header("content-security-policy").is_some());
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestApp::spawn().await;
    let response = app.get("/no-such-page").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Landing Page
// ============================================================================

#[tokio::test]
async fn test_home_shows_counts_and_survives_a_failed_one() {
    let app = TestApp::spawn().await;
    for (table, total) in [
        ("produce_listings", "27"),
        ("land_listings", "8"),
        ("equipment_listings", "14"),
    ] {
        app.backend
            .mock_async(|when, then| {
                when.method(httpmock::Method::HEAD)
                    .path(format!("/rest/v1/{table}"));
                then.status(200).header("content-range", format!("*/{total}"));
            })
            .await;
    }
    // No mock for profiles: that count fails and shows as "-".

    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("<strong>27</strong>Fresh produce listings"));
    assert!(response.body.contains("<strong>8</strong>Land plots"));
    assert!(response.body.contains("<strong>14</strong>Equipment items"));
    assert!(response.body.contains("<strong>-</strong>Community members"));
}

// ============================================================================
// Browsing
// ============================================================================

#[tokio::test]
async fn test_browse_filters_by_search_text() {
    let app = TestApp::spawn().await;
    let listings = app
        .mock_rows(
            "/rest/v1/land_listings",
            json!([
                plot_row(PLOT_A, "Canal-side plot", "Mandya, Karnataka", 2),
                plot_row(PLOT_B, "Hilltop garden", "Ooty, Tamil Nadu", 3),
            ]),
        )
        .await;

    let all = app.get("/browse").await;
    assert_eq!(all.status, StatusCode::OK);
    assert!(all.body.contains("Canal-side plot"));
    assert!(all.body.contains("Hilltop garden"));

    let filtered = app.get("/browse?search=ooty").await;
    assert_eq!(filtered.status, StatusCode::OK);
    assert!(filtered.body.contains("Hilltop garden"));
    assert!(!filtered.body.contains("Canal-side plot"));

    // Second read came from the listing cache.
    listings.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_browse_rejects_malformed_price() {
    let app = TestApp::spawn().await;
    app.mock_rows("/rest/v1/land_listings", json!([])).await;

    let response = app.get("/browse?min_price=cheap").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_plot_is_not_found() {
    let app = TestApp::spawn().await;
    app.mock_rows("/rest/v1/land_listings", json!([])).await;

    let response = app.get(&format!("/plots/{PLOT_A}")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_equipment_only_offers_available_items() {
    let app = TestApp::spawn().await;
    app.mock_rows(
        "/rest/v1/equipment_listings",
        json!([
            equipment_row(TILLER, "Power tiller", "available"),
            equipment_row(SPRAYER, "Knapsack sprayer", "rented"),
        ]),
    )
    .await;

    let response = app.get("/equipment").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Knapsack sprayer"));
    assert!(response.body.contains(&format!("/payment?type=equipment&amp;id={TILLER}")));
    assert!(!response.body.contains(&format!("id={SPRAYER}")));
}

#[tokio::test]
async fn test_marketplace_filters_by_price() {
    let app = TestApp::spawn().await;
    let mut mangoes = produce_row(MANGOES, "Alphonso mangoes", 12);
    mangoes["price_per_unit"] = json!(600);
    app.mock_rows(
        "/rest/v1/produce_listings",
        json!([produce_row(TOMATOES, "Heirloom tomatoes", 20), mangoes]),
    )
    .await;

    let response = app.get("/marketplace?max_price=100").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Heirloom tomatoes"));
    assert!(!response.body.contains("Alphonso mangoes"));
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_add_to_cart_updates_count() {
    let app = TestApp::spawn().await;
    app.mock_rows(
        "/rest/v1/produce_listings",
        json!([produce_row(TOMATOES, "Heirloom tomatoes", 20)]),
    )
    .await;

    let empty = app.get("/cart/count").await;
    assert!(empty.body.contains(">0<"));

    let added = app
        .post_form(
            "/cart/add",
            &[("produce_id", TOMATOES), ("redirect_to", "/marketplace")],
        )
        .await;
    assert_eq!(added.status, StatusCode::SEE_OTHER);
    assert_eq!(added.location(), Some("/marketplace"));

    app.post_form("/cart/add", &[("produce_id", TOMATOES)]).await;
    let count = app.get("/cart/count").await;
    assert!(count.body.contains(">2<"));

    let cart = app.get("/cart").await;
    assert_eq!(cart.status, StatusCode::OK);
    assert!(cart.body.contains("Heirloom tomatoes"));
}

#[tokio::test]
async fn test_sold_out_produce_stays_out_of_cart() {
    let app = TestApp::spawn().await;
    app.mock_rows(
        "/rest/v1/produce_listings",
        json!([produce_row(MANGOES, "Alphonso mangoes", 0)]),
    )
    .await;

    let response = app.post_form("/cart/add", &[("produce_id", MANGOES)]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let count = app.get("/cart/count").await;
    assert!(count.body.contains(">0<"));
}

#[tokio::test]
async fn test_cart_add_ignores_offsite_redirect() {
    let app = TestApp::spawn().await;
    app.mock_rows(
        "/rest/v1/produce_listings",
        json!([produce_row(TOMATOES, "Heirloom tomatoes", 5)]),
    )
    .await;

    let response = app
        .post_form(
            "/cart/add",
            &[("produce_id", TOMATOES), ("redirect_to", "https://evil.example")],
        )
        .await;
    assert_eq!(response.location(), Some("/marketplace"));
}

#[tokio::test]
async fn test_checkout_requires_sign_in() {
    let app = TestApp::spawn().await;
    let response = app
        .post_form("/cart/checkout", &[("address", "12 MG Road"), ("phone", "98450 12345")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/auth/login"));
}

// ============================================================================
// Auth Gates
// ============================================================================

#[tokio::test]
async fn test_register_without_role_is_rejected() {
    let app = TestApp::spawn().await;
    let signup = app
        .backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST).path("/auth/v1/signup");
            then.status(200).json_body(json!({}));
        })
        .await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("full_name", "Meena Iyer"),
                ("email", "meena@example.com"),
                ("password", "long enough password"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Role required"));
    signup.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_wrong_password_re_renders_login() {
    let app = TestApp::spawn().await;
    app.backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST).path("/auth/v1/token");
            then.status(400)
                .json_body(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"}));
        })
        .await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", "asha@example.com"), ("password", "not it")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("asha@example.com"));
}

#[tokio::test]
async fn test_dashboards_redirect_anonymous_visitors() {
    let app = TestApp::spawn().await;
    for path in ["/dashboard", "/dashboard/user", "/listings/land/new", "/payment?type=marketplace"] {
        let response = app.get(path).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{path}");
        assert_eq!(response.location(), Some("/auth/login"), "{path}");
    }
}

#[tokio::test]
async fn test_signed_in_user_cannot_open_farmer_dashboard() {
    let app = TestApp::spawn().await;
    app.sign_in().await;

    let index = app.get("/dashboard").await;
    assert_eq!(index.location(), Some("/dashboard/user"));

    let farmer = app.get("/dashboard/farmer").await;
    assert_eq!(farmer.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_role_cannot_list_land() {
    let app = TestApp::spawn().await;
    app.sign_in().await;

    let response = app.get("/listings/land/new").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
