//! In-process tests of the mock payment flow.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::StatusCode;
use farmshare_integration_tests::{
    TestApp, TestResponse, USER_ID, equipment_row, payment_token, plot_row, produce_row,
};
use serde_json::{Value, json};

const TILLER: &str = "2a3b4c5d-6e7f-4801-9a2b-3c4d5e6f7081";
const RICE: &str = "8f9e0d1c-2b3a-4c5d-8e7f-6a5b4c3d2e1f";
const HONEY: &str = "c1d2e3f4-a5b6-4c7d-8e9f-0a1b2c3d4e5f";
const PLOT: &str = "6e5d4c3b-2a19-4f8e-9d7c-6b5a49382716";

const UPI: [(&str, &str); 2] = [("method", "upi"), ("upi_id", "asha@okbank")];

async fn mock_rental_backend(app: &TestApp) -> httpmock::Mock<'_> {
    mock_slow_rental_backend(app, Duration::ZERO).await
}

/// Rental backend whose listing reads take `delay` to answer.
async fn mock_slow_rental_backend(app: &TestApp, delay: Duration) -> httpmock::Mock<'_> {
    app.backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/rest/v1/equipment_listings");
            then.status(200)
                .delay(delay)
                .json_body(json!([equipment_row(TILLER, "Power tiller", "available")]));
        })
        .await;
    app.backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path("/rest/v1/equipment_listings");
            then.status(204);
        })
        .await;
    app.backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/rest/v1/equipment_rentals")
                .header("authorization", "Bearer user-access-token");
            then.status(201).json_body(json!([{
                "id": "4b5c6d7e-8f90-4a1b-8c2d-3e4f5a6b7c8d",
                "equipment_id": TILLER,
                "user_id": USER_ID,
                "start_date": "2026-10-19",
                "end_date": "2026-10-24",
                "total_price": 2500,
                "status": "active"
            }]));
        })
        .await
}

#[tokio::test]
async fn test_rental_payment_is_written_once() {
    let app = TestApp::spawn().await;
    app.sign_in().await;
    let insert = mock_rental_backend(&app).await;

    let form = app
        .get(&format!("/payment?type=equipment&id={TILLER}"))
        .await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Power tiller"));
    let token = payment_token(&form.body).unwrap();

    let fields = [
        ("token", token.as_str()),
        ("method", "upi"),
        ("upi_id", "asha@okbank"),
    ];
    let paid = app.post_form("/payment", &fields).await;
    assert_eq!(paid.status, StatusCode::SEE_OTHER);
    assert_eq!(paid.location(), Some("/dashboard/user"));

    // Replaying the same form must not book a second rental.
    let replay = app.post_form("/payment", &fields).await;
    assert_eq!(replay.status, StatusCode::SEE_OTHER);
    assert_eq!(replay.location(), Some("/dashboard/user"));

    insert.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_overlapping_submissions_book_one_rental() {
    let app = TestApp::spawn().await;
    app.sign_in().await;
    // Slow listing reads keep the first submission in flight.
    let insert = mock_slow_rental_backend(&app, Duration::from_millis(300)).await;

    let form = app
        .get(&format!("/payment?type=equipment&id={TILLER}"))
        .await;
    let token = payment_token(&form.body).unwrap();
    let fields = [("token", token.as_str()), UPI[0], UPI[1]];

    let (a, b) = tokio::join!(
        app.post_form("/payment", &fields),
        app.post_form("/payment", &fields)
    );
    assert_eq!(a.location(), Some("/dashboard/user"));
    assert_eq!(b.location(), Some("/dashboard/user"));

    insert.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_invalid_card_sends_back_to_the_form() {
    let app = TestApp::spawn().await;
    app.sign_in().await;
    let insert = mock_rental_backend(&app).await;

    let form = app
        .get(&format!("/payment?type=equipment&id={TILLER}"))
        .await;
    let token = payment_token(&form.body).unwrap();

    let rejected = app
        .post_form(
            "/payment",
            &[
                ("token", token.as_str()),
                ("method", "card"),
                ("card_number", "4242 4242 4242 4241"),
                ("cardholder", "Asha Rao"),
                ("expiry", "08/30"),
                ("cvv", "123"),
            ],
        )
        .await;
    assert_eq!(rejected.status, StatusCode::SEE_OTHER);
    assert_eq!(
        rejected.location(),
        Some(format!("/payment?type=equipment&id={TILLER}").as_str())
    );
    insert.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_rented_equipment_cannot_be_paid_for() {
    let app = TestApp::spawn().await;
    app.sign_in().await;
    app.mock_rows(
        "/rest/v1/equipment_listings",
        json!([equipment_row(TILLER, "Power tiller", "rented")]),
    )
    .await;

    let response = app
        .get(&format!("/payment?type=equipment&id={TILLER}"))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/equipment"));
}

#[tokio::test]
async fn test_unknown_payment_type_is_bad_request() {
    let app = TestApp::spawn().await;
    app.sign_in().await;

    let response = app.get("/payment?type=subscription").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_checkout_needs_delivery_details() {
    let app = TestApp::spawn().await;
    app.sign_in().await;
    app.mock_rows(
        "/rest/v1/produce_listings",
        json!([produce_row(RICE, "Sona masoori rice", 50)]),
    )
    .await;
    app.post_form("/cart/add", &[("produce_id", RICE)]).await;

    let missing = app
        .post_form("/cart/checkout", &[("address", "12 MG Road"), ("phone", " ")])
        .await;
    assert_eq!(missing.location(), Some("/cart"));

    let payment = app.get("/payment?type=marketplace").await;
    assert_eq!(payment.location(), Some("/cart"));

    let ready = app
        .post_form(
            "/cart/checkout",
            &[("address", "12 MG Road, Mysuru"), ("phone", "98450 12345")],
        )
        .await;
    assert_eq!(ready.location(), Some("/payment?type=marketplace"));

    let form = app.get("/payment?type=marketplace").await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Sona masoori rice"));
    assert!(payment_token(&form.body).is_some());
}

// =============================================================================
// Marketplace and lease writes
// =============================================================================

fn order_row(produce_id: &str, quantity: u32, total: u32) -> Value {
    json!([{
        "id": "9a8b7c6d-5e4f-4a3b-9c2d-1e0f9a8b7c6d",
        "produce_id": produce_id,
        "buyer_id": USER_ID,
        "quantity": quantity,
        "total_price": total,
        "delivery_address": "12 MG Road, Mysuru",
        "status": "pending",
        "created_at": "2026-10-19T10:00:00Z"
    }])
}

/// Listing rows keyed by id, so each cart line reads its own stock.
async fn mock_produce(app: &TestApp, id: &str, name: &str, quantity: u32) {
    let row = produce_row(id, name, quantity);
    app.backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/rest/v1/produce_listings")
                .query_param("id", format!("eq.{id}"));
            then.status(200).json_body(json!([row]));
        })
        .await;
}

async fn mock_order<'a>(app: &'a TestApp, produce_id: &str, status: u16) -> httpmock::Mock<'a> {
    app.backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/rest/v1/orders")
                .header("authorization", "Bearer user-access-token")
                .json_body_partial(json!({"produce_id": produce_id}).to_string());
            if status == 201 {
                then.status(201).json_body(order_row(produce_id, 1, 40));
            } else {
                then.status(status)
                    .json_body(json!({"message": "could not save order"}));
            }
        })
        .await
}

async fn mock_stock_update<'a>(
    app: &'a TestApp,
    produce_id: &str,
    patch: Value,
    status: u16,
) -> httpmock::Mock<'a> {
    app.backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path("/rest/v1/produce_listings")
                .query_param("id", format!("eq.{produce_id}"))
                .json_body(patch);
            then.status(status);
        })
        .await
}

/// Put one rice and one honey line in the cart and go to the payment form.
async fn fill_cart(app: &TestApp) -> String {
    mock_produce(app, RICE, "Sona masoori rice", 50).await;
    mock_produce(app, HONEY, "Forest honey", 1).await;
    app.post_form("/cart/add", &[("produce_id", RICE)]).await;
    app.post_form("/cart/add", &[("produce_id", HONEY)]).await;
    app.post_form(
        "/cart/checkout",
        &[("address", "12 MG Road, Mysuru"), ("phone", "98450 12345")],
    )
    .await;

    let form = app.get("/payment?type=marketplace").await;
    assert_eq!(form.status, StatusCode::OK);
    payment_token(&form.body).unwrap()
}

async fn pay(app: &TestApp, token: &str) -> TestResponse {
    app.post_form("/payment", &[("token", token), UPI[0], UPI[1]])
        .await
}

#[tokio::test]
async fn test_cart_payment_orders_every_line() {
    let app = TestApp::spawn().await;
    app.sign_in().await;
    let token = fill_cart(&app).await;
    let rice_order = mock_order(&app, RICE, 201).await;
    let honey_order = mock_order(&app, HONEY, 201).await;
    let rice_stock = mock_stock_update(
        &app,
        RICE,
        json!({"quantity_available": 49, "status": "active"}),
        204,
    )
    .await;
    let honey_stock = mock_stock_update(
        &app,
        HONEY,
        json!({"quantity_available": 0, "status": "sold_out"}),
        204,
    )
    .await;

    let paid = pay(&app, &token).await;
    assert_eq!(paid.location(), Some("/dashboard/user"));
    rice_order.assert_hits_async(1).await;
    honey_order.assert_hits_async(1).await;
    rice_stock.assert_hits_async(1).await;
    honey_stock.assert_hits_async(1).await;

    let count = app.get("/cart/count").await;
    assert!(count.body.contains(">0<"));

    // Delivery details go with the cart.
    app.post_form("/cart/add", &[("produce_id", RICE)]).await;
    let payment = app.get("/payment?type=marketplace").await;
    assert_eq!(payment.location(), Some("/cart"));
    let cart = app.get("/cart").await;
    assert!(cart.body.contains("Delivery details required"));
}

#[tokio::test]
async fn test_failed_order_keeps_the_rest_in_the_cart() {
    let app = TestApp::spawn().await;
    app.sign_in().await;
    let token = fill_cart(&app).await;
    let rice_order = mock_order(&app, RICE, 201).await;
    let honey_order = mock_order(&app, HONEY, 500).await;
    mock_stock_update(
        &app,
        RICE,
        json!({"quantity_available": 49, "status": "active"}),
        204,
    )
    .await;

    let failed = pay(&app, &token).await;
    assert_eq!(failed.location(), Some("/cart"));
    rice_order.assert_hits_async(1).await;
    honey_order.assert_hits_async(1).await;

    let cart = app.get("/cart").await;
    assert!(cart.body.contains("1 of 2 items were ordered"));
    assert!(cart.body.contains("Forest honey"));
    assert!(!cart.body.contains("Sona masoori rice"));

    let count = app.get("/cart/count").await;
    assert!(count.body.contains(">1<"));
}

#[tokio::test]
async fn test_stock_failure_does_not_undo_the_order() {
    let app = TestApp::spawn().await;
    app.sign_in().await;
    let token = fill_cart(&app).await;
    mock_order(&app, RICE, 201).await;
    mock_order(&app, HONEY, 201).await;
    mock_stock_update(
        &app,
        RICE,
        json!({"quantity_available": 49, "status": "active"}),
        204,
    )
    .await;
    let honey_stock = mock_stock_update(
        &app,
        HONEY,
        json!({"quantity_available": 0, "status": "sold_out"}),
        500,
    )
    .await;

    let paid = pay(&app, &token).await;
    assert_eq!(paid.location(), Some("/dashboard/user"));
    honey_stock.assert_hits_async(1).await;

    let count = app.get("/cart/count").await;
    assert!(count.body.contains(">0<"));
    let cart = app.get("/cart").await;
    assert!(cart.body.contains("2 orders placed"));
}

#[tokio::test]
async fn test_lease_payment_closes_the_plot() {
    let app = TestApp::spawn().await;
    app.sign_in().await;
    app.mock_rows(
        "/rest/v1/land_listings",
        json!([plot_row(PLOT, "Canal-side plot", "Mandya, Karnataka", 2)]),
    )
    .await;
    let lease = app
        .backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/rest/v1/plot_leases")
                .header("authorization", "Bearer user-access-token")
                .json_body_partial(
                    json!({"land_listing_id": PLOT, "area_sqft": 1200, "status": "active"})
                        .to_string(),
                );
            then.status(201).json_body(json!([{
                "id": "1f2e3d4c-5b6a-4798-8a7b-6c5d4e3f2a1b",
                "land_listing_id": PLOT,
                "user_id": USER_ID,
                "area_sqft": 1200,
                "monthly_price": 2400,
                "start_date": "2026-10-19",
                "end_date": "2027-10-19",
                "status": "active"
            }]));
        })
        .await;
    let closed = app
        .backend
        .mock_async(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path("/rest/v1/land_listings")
                .query_param("id", format!("eq.{PLOT}"))
                .json_body(json!({"available_area_sqft": 0, "status": "leased"}));
            then.status(204);
        })
        .await;

    let form = app.get(&format!("/payment?type=lease&id={PLOT}")).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Canal-side plot"));
    let token = payment_token(&form.body).unwrap();

    let paid = pay(&app, &token).await;
    assert_eq!(paid.location(), Some("/dashboard/user"));
    lease.assert_hits_async(1).await;
    closed.assert_hits_async(1).await;
}
