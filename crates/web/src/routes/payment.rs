//! Mock payment pages.
//!
//! The GET page shows a server-computed summary and a card/UPI form
//! carrying a one-time token. The POST consumes the token, validates the
//! form and then writes the lease, rental or orders. Nothing is charged.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use farmshare_core::{CardInput, PaymentError, PaymentKind, PaymentMethod};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Page, RequireUser};
use crate::models::{
    CheckoutDetails, CurrentUser, Flash, PaymentToken, load_cart, save_cart, session_keys,
};
use crate::services::{CheckoutError, CheckoutService, PaymentSummary, SummaryLine};
use crate::state::AppState;

/// Where a successful payment lands.
const SUCCESS_PATH: &str = "/dashboard/user";

// =============================================================================
// Request Types
// =============================================================================

/// `?type=lease|equipment|marketplace&id=...`
#[derive(Debug, Deserialize)]
pub struct PaymentParams {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub id: Option<String>,
}

/// Submitted payment form. Only the token ties it to an order.
#[derive(Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub cardholder: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvv: String,
    #[serde(default)]
    pub upi_id: String,
}

impl std::fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentForm")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl PaymentForm {
    fn payment_method(&self) -> std::result::Result<PaymentMethod, PaymentError> {
        match self.method.as_str() {
            "card" => PaymentMethod::card(
                CardInput {
                    number: &self.card_number,
                    cardholder: &self.cardholder,
                    expiry: &self.expiry,
                    cvv: &self.cvv,
                },
                Utc::now().date_naive(),
            ),
            "upi" => PaymentMethod::upi(&self.upi_id),
            other => Err(PaymentError::UnknownMethod(other.to_string())),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "payment.html")]
pub struct PaymentTemplate {
    pub page: Page,
    pub title: &'static str,
    pub heading: String,
    pub lines: Vec<SummaryLine>,
    pub amount: String,
    pub token: String,
    pub cancel_path: &'static str,
}

// =============================================================================
// Helpers
// =============================================================================

/// The page a visitor came from for each kind of payment.
const fn listing_path(kind: PaymentKind) -> &'static str {
    match kind {
        PaymentKind::Lease => "/browse",
        PaymentKind::Equipment => "/equipment",
        PaymentKind::Marketplace => "/cart",
    }
}

fn payment_path(kind: PaymentKind, item_id: Option<&str>) -> String {
    item_id.map_or_else(
        || format!("/payment?type={kind}"),
        |id| format!("/payment?type={kind}&id={id}"),
    )
}

fn log_checkout_failure(err: &CheckoutError, kind: PaymentKind) {
    if err.is_server_error() {
        let event_id = sentry::capture_error(err);
        tracing::error!(error = %err, sentry_event_id = %event_id, %kind, "Checkout failed");
    } else {
        tracing::info!(error = %err, %kind, "Checkout rejected");
    }
}

/// Flash the failure and send the visitor back to the listing.
async fn reject(session: &Session, err: &CheckoutError, kind: PaymentKind) -> Response {
    log_checkout_failure(err, kind);
    Flash::error("Payment not completed", err.user_message())
        .store(session)
        .await;
    Redirect::to(listing_path(kind)).into_response()
}

async fn checkout_details(session: &Session) -> Result<Option<CheckoutDetails>> {
    let details: Option<CheckoutDetails> = session.get(session_keys::CHECKOUT).await?;
    Ok(details.filter(CheckoutDetails::is_complete))
}

async fn summarize(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    kind: PaymentKind,
    item_id: Option<&str>,
) -> Result<std::result::Result<PaymentSummary, CheckoutError>> {
    let checkout = CheckoutService::new(state.backend());
    let today = Utc::now().date_naive();
    let needs_id = || {
        item_id.ok_or_else(|| AppError::BadRequest(format!("{kind} payment needs an id")))
    };

    Ok(match kind {
        PaymentKind::Lease => checkout.lease_summary(user, needs_id()?, today).await,
        PaymentKind::Equipment => checkout.rental_summary(user, needs_id()?, today).await,
        PaymentKind::Marketplace => {
            let cart = load_cart(session).await?;
            let details = checkout_details(session).await?;
            CheckoutService::cart_summary(&cart, details.as_ref())
        }
    })
}

// =============================================================================
// Routes
// =============================================================================

/// Show the order summary and payment form.
#[instrument(skip(state, session, page, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    page: Page,
    Query(params): Query<PaymentParams>,
) -> Result<Response> {
    let kind: PaymentKind = params
        .kind
        .parse()
        .map_err(|e: PaymentError| AppError::BadRequest(e.to_string()))?;

    let summary = match summarize(&state, &session, &user, kind, params.id.as_deref()).await? {
        Ok(summary) => summary,
        Err(CheckoutError::MissingDeliveryDetails) => {
            Flash::error(
                "Delivery details required",
                "Please enter a delivery address and phone number",
            )
            .store(&session)
            .await;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(e) => return Ok(reject(&session, &e, kind).await),
    };

    let token = PaymentToken {
        token: Uuid::new_v4().to_string(),
        kind,
        item_id: summary.item_id.clone(),
    };
    session.insert(session_keys::PAYMENT_TOKEN, &token).await?;

    Ok(PaymentTemplate {
        page,
        title: kind.title(),
        heading: summary.heading,
        lines: summary.lines,
        amount: summary.amount.display(),
        token: token.token,
        cancel_path: listing_path(kind),
    }
    .into_response())
}

/// Take the payment and record what was bought.
///
/// The token is claimed in shared state before anything else, so a second
/// submission of the same form is turned away even if the first is still
/// running.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let issued: Option<PaymentToken> = session.get(session_keys::PAYMENT_TOKEN).await?;
    let claimed = match issued.filter(|t| !form.token.is_empty() && t.token == form.token) {
        Some(token) if state.payment_claims().claim(&token.token).await => Some(token),
        _ => None,
    };
    if claimed.is_some() {
        session.remove_value(session_keys::PAYMENT_TOKEN).await?;
        session.save().await?;
    }
    let Some(issued) = claimed else {
        tracing::warn!("Payment submitted without a valid token");
        Flash::error(
            "Payment already submitted",
            "This payment form has expired. Check your dashboard before trying again.",
        )
        .store(&session)
        .await;
        return Ok(Redirect::to(SUCCESS_PATH).into_response());
    };
    let kind = issued.kind;
    let retry_path = payment_path(kind, issued.item_id.as_deref());

    let method = match form.payment_method() {
        Ok(method) => method,
        Err(e) => {
            tracing::info!(error = %e, "Payment form rejected");
            Flash::error("Payment failed", capitalize(&e.to_string()))
                .store(&session)
                .await;
            return Ok(Redirect::to(&retry_path).into_response());
        }
    };
    add_breadcrumb("payment", "Mock payment accepted", Some(&[("kind", kind.as_str())]));

    let checkout = CheckoutService::new(state.backend());
    let today = Utc::now().date_naive();
    let item_id = issued.item_id.as_deref().unwrap_or_default();

    let outcome = match kind {
        PaymentKind::Lease => checkout.lease_plot(&user, item_id, today).await.map(|lease| {
            format!(
                "Your lease runs from {} to {}. Paid {} by {}.",
                lease.start_date.format("%d %b %Y"),
                lease.end_date.format("%d %b %Y"),
                lease.monthly_price.display(),
                method.summary()
            )
        }),
        PaymentKind::Equipment => checkout
            .rent_equipment(&user, item_id, today)
            .await
            .map(|rental| {
                format!(
                    "Rental confirmed until {}. Paid {} by {}.",
                    rental.end_date.format("%d %b %Y"),
                    rental.total_price.display(),
                    method.summary()
                )
            }),
        PaymentKind::Marketplace => {
            let mut cart = load_cart(&session).await?;
            let result = match checkout_details(&session).await? {
                Some(details) => checkout.place_orders(&user, &mut cart, &details).await,
                None => Err(CheckoutError::MissingDeliveryDetails),
            };
            save_cart(&session, &cart).await?;
            if result.is_ok() {
                session
                    .remove::<CheckoutDetails>(session_keys::CHECKOUT)
                    .await?;
            }
            result.map(|placed| format!("{placed} orders placed. Paid by {}.", method.summary()))
        }
    };

    match outcome {
        Ok(message) => {
            tracing::info!(%kind, "Payment completed");
            Flash::success("Payment successful", message).store(&session).await;
            Ok(Redirect::to(SUCCESS_PATH).into_response())
        }
        Err(e) => Ok(reject(&session, &e, kind).await),
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
