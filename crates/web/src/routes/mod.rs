//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Landing page with live stats
//!
//! # Browsing
//! GET  /browse                        - Land plots (filters in the query string)
//! GET  /plots/{id}                    - Plot details and lease quote
//! GET  /equipment                     - Equipment for rent
//! GET  /marketplace                   - Produce for sale
//!
//! # Cart (session)
//! GET  /cart                          - Cart page
//! POST /cart/add                      - Add one unit of a produce listing
//! POST /cart/update                   - Set a line's quantity
//! POST /cart/remove                   - Remove a line
//! POST /cart/clear                    - Empty the cart
//! GET  /cart/count                    - Cart count badge (fragment)
//! POST /cart/checkout                 - Save delivery details, go to payment
//!
//! # Payment (requires auth)
//! GET  /payment?type=...&id=...       - Order summary and payment form
//! POST /payment                       - Mock payment (rate limited)
//!
//! # Auth
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action (rate limited)
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action (rate limited)
//! POST /auth/logout                   - Logout action
//!
//! # Dashboards (requires auth)
//! GET  /dashboard                     - Redirect to the role dashboard
//! GET  /dashboard/user                - Leases, rentals, produce, orders
//! GET  /dashboard/farmer              - Plots, leases on them, revenue
//! GET  /dashboard/vendor              - Equipment, rentals, revenue
//!
//! # Listings (requires auth and role)
//! GET  /listings/{kind}/new           - New listing form
//! POST /listings/{kind}               - Create listing
//! GET  /listings/{kind}/{id}/edit     - Edit form
//! POST /listings/{kind}/{id}          - Save edits
//! ```
//!
//! `{kind}` is one of `land`, `equipment` or `produce`.

pub mod auth;
pub mod browse;
pub mod cart;
pub mod dashboard;
pub mod equipment;
pub mod home;
pub mod listings;
pub mod marketplace;
pub mod params;
pub mod payment;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, payment_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router. Form posts are rate limited per client.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            post(auth::login)
                .layer(auth_rate_limiter())
                .get(auth::login_page),
        )
        .route(
            "/register",
            post(auth::register)
                .layer(auth_rate_limiter())
                .get(auth::register_page),
        )
        .route("/logout", post(auth::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
        .route("/checkout", post(cart::checkout))
}

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/user", get(dashboard::user))
        .route("/farmer", get(dashboard::farmer))
        .route("/vendor", get(dashboard::vendor))
}

/// Create the listing management routes router.
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/land", post(listings::create_land))
        .route("/land/new", get(listings::new_land))
        .route("/land/{id}", post(listings::update_land))
        .route("/land/{id}/edit", get(listings::edit_land))
        .route("/equipment", post(listings::create_equipment))
        .route("/equipment/new", get(listings::new_equipment))
        .route("/equipment/{id}", post(listings::update_equipment))
        .route("/equipment/{id}/edit", get(listings::edit_equipment))
        .route("/produce", post(listings::create_produce))
        .route("/produce/new", get(listings::new_produce))
        .route("/produce/{id}", post(listings::update_produce))
        .route("/produce/{id}/edit", get(listings::edit_produce))
}

/// Create all routes for the site.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Landing page
        .route("/", get(home::home))
        // Browsing
        .route("/browse", get(browse::index))
        .route("/plots/{id}", get(browse::show))
        .route("/equipment", get(equipment::index))
        .route("/marketplace", get(marketplace::index))
        // Cart
        .nest("/cart", cart_routes())
        // Mock payment
        .route(
            "/payment",
            post(payment::submit)
                .layer(payment_rate_limiter())
                .get(payment::show),
        )
        // Auth
        .nest("/auth", auth_routes())
        // Dashboards
        .nest("/dashboard", dashboard_routes())
        // Listing management
        .nest("/listings", listing_routes())
}
