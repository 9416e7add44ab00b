//! Cart route handlers.
//!
//! The cart lives in the session. Every change is a plain form post that
//! redirects back, so the pages work without scripts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use farmshare_core::{CartItem, NewCartItem, ProduceId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Page, RequireUser};
use crate::models::{CheckoutDetails, Flash, load_cart, save_cart, session_keys};
use crate::routes::params::local_path;
use crate::services::ListingService;
use crate::state::AppState;
use crate::supabase::{AccessToken, BackendError};

// =============================================================================
// View Types
// =============================================================================

/// A cart line for display.
#[derive(Clone)]
pub struct CartLineView {
    pub id: String,
    pub name: String,
    pub farmer: String,
    pub unit: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            farmer: item.farmer.clone(),
            unit: item.unit.clone(),
            quantity: item.quantity,
            price: item.price.display(),
            line_total: item.line_total().display(),
        }
    }
}

// =============================================================================
// Form Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub produce_id: String,
    /// Page to return to; defaults to the marketplace.
    pub redirect_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub id: String,
    /// Signed so that a zero or negative value removes the line.
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub page: Page,
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub item_count: u32,
    pub address: String,
    pub phone: String,
}

/// Cart badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Routes
// =============================================================================

/// Display the cart page.
#[instrument(skip(session, page))]
pub async fn show(session: Session, page: Page) -> Result<impl IntoResponse> {
    let cart = load_cart(&session).await?;
    let details: Option<CheckoutDetails> = session.get(session_keys::CHECKOUT).await?;
    let (address, phone) = details.map_or_else(Default::default, |d| (d.address, d.phone));

    Ok(CartTemplate {
        page,
        lines: cart.items().iter().map(CartLineView::from).collect(),
        total: cart.total().display(),
        item_count: cart.item_count(),
        address,
        phone,
    })
}

/// Add one unit of a produce listing.
///
/// The line is built from the listing row, never from the form, so the
/// price can't be tampered with.
#[instrument(skip(state, session, form), fields(produce_id = %form.produce_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let back = local_path(form.redirect_to.as_deref(), "/marketplace").to_string();

    let Ok(id) = ProduceId::parse(&form.produce_id) else {
        Flash::error("Not found", "That item is no longer listed").store(&session).await;
        return Ok(Redirect::to(&back).into_response());
    };

    let item = match ListingService::new(state.backend())
        .produce_item(id, AccessToken::Anon)
        .await
    {
        Ok(item) => item,
        Err(BackendError::NotFound(_)) => {
            Flash::error("Not found", "That item is no longer listed").store(&session).await;
            return Ok(Redirect::to(&back).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    if !item.in_stock() {
        Flash::error("Out of stock", format!("{} is sold out", item.name))
            .store(&session)
            .await;
        return Ok(Redirect::to(&back).into_response());
    }

    let mut cart = load_cart(&session).await?;
    let quantity = cart.add(NewCartItem {
        id: item.id.to_string(),
        name: item.name.clone(),
        price: item.price_per_unit,
        unit: item.unit.clone(),
        farmer: item.seller_name().to_string(),
        produce_id: item.id,
    });
    save_cart(&session, &cart).await?;

    add_breadcrumb("cart", "Added to cart", Some(&[("produce_id", form.produce_id.as_str())]));
    tracing::info!(quantity, "Added to cart");
    Flash::success("Added to cart", format!("{} added to your cart", item.name))
        .store(&session)
        .await;
    Ok(Redirect::to(&back).into_response())
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(session, form), fields(line = %form.id, quantity = form.quantity))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Redirect> {
    let mut cart = load_cart(&session).await?;
    cart.set_quantity(&form.id, form.quantity);
    save_cart(&session, &cart).await?;
    Ok(Redirect::to("/cart"))
}

/// Remove a line.
#[instrument(skip(session, form), fields(line = %form.id))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Redirect> {
    let mut cart = load_cart(&session).await?;
    if cart.remove(&form.id) {
        save_cart(&session, &cart).await?;
        Flash::success("Removed", "Item removed from your cart")
            .store(&session)
            .await;
    }
    Ok(Redirect::to("/cart"))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Redirect> {
    let mut cart = load_cart(&session).await?;
    cart.clear();
    save_cart(&session, &cart).await?;
    Flash::success("Cart cleared", "Your cart is now empty")
        .store(&session)
        .await;
    Ok(Redirect::to("/cart"))
}

/// Cart badge fragment.
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    let count = load_cart(&session)
        .await
        .map(|cart| cart.item_count())
        .unwrap_or(0);
    CartCountTemplate { count }
}

/// Save delivery details and go to payment.
#[instrument(skip(session, user, form), fields(user_id = %user.id))]
pub async fn checkout(
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<CheckoutForm>,
) -> Result<Redirect> {
    let cart = load_cart(&session).await?;
    if cart.is_empty() {
        Flash::error("Cart is empty", "Add something from the marketplace first")
            .store(&session)
            .await;
        return Ok(Redirect::to("/marketplace"));
    }

    let details = CheckoutDetails {
        address: form.address.trim().to_string(),
        phone: form.phone.trim().to_string(),
    };
    if details.address.is_empty() || details.phone.is_empty() {
        // Keep what was typed so the form comes back filled in.
        session.insert(session_keys::CHECKOUT, &details).await?;
        Flash::error(
            "Delivery details required",
            "Please enter a delivery address and phone number",
        )
        .store(&session)
        .await;
        return Ok(Redirect::to("/cart"));
    }

    session.insert(session_keys::CHECKOUT, &details).await?;
    Ok(Redirect::to("/payment?type=marketplace"))
}
