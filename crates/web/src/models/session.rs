//! Session-related types.
//!
//! Everything the site remembers about a visitor lives in the session:
//! who they are, their cart, checkout details, one-time payment tokens and
//! the notice to show on the next page.

use chrono::{DateTime, Utc};
use farmshare_core::{AppRole, Cart, Email, PaymentKind, ProfileId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session-stored user identity.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: ProfileId,
    pub email: Email,
    pub full_name: String,
    pub role: AppRole,
    /// Backend access token; requests made for this user carry it.
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CurrentUser {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// First name for greetings.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.full_name)
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Kind of notice, used as a CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// A one-shot notice shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub title: String,
    pub message: String,
}

impl Flash {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Store this notice for the next page.
    ///
    /// Failures are logged; a lost notice never fails the request.
    pub async fn store(self, session: &Session) {
        if let Err(e) = session.insert(keys::FLASH, self).await {
            tracing::warn!(error = %e, "Failed to store flash notice");
        }
    }

    /// Take the pending notice, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        session.remove::<Self>(keys::FLASH).await.ok().flatten()
    }
}

/// Load the visitor's cart; a missing cart is an empty one.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

/// Save the cart, dropping the key once it is empty.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    if cart.is_empty() {
        session.remove::<Cart>(keys::CART).await?;
        Ok(())
    } else {
        session.insert(keys::CART, cart).await
    }
}

/// Delivery details captured at cart checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub address: String,
    pub phone: String,
}

impl CheckoutDetails {
    /// Both the address and the phone number were given.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.address.trim().is_empty() && !self.phone.trim().is_empty()
    }

    /// Value stored in the order's `delivery_address` column.
    #[must_use]
    pub fn delivery_address(&self) -> String {
        format!("{}\nPhone: {}", self.address.trim(), self.phone.trim())
    }
}

/// One-time token guarding a payment form against double submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentToken {
    pub token: String,
    pub kind: PaymentKind,
    /// Listing id for leases and rentals; `None` for the cart.
    pub item_id: Option<String>,
}

/// Session keys.
pub mod keys {
    /// The signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// The produce cart.
    pub const CART: &str = "cart";

    /// Delivery details between cart checkout and payment.
    pub const CHECKOUT: &str = "checkout";

    /// Outstanding payment form token.
    pub const PAYMENT_TOKEN: &str = "payment_token";

    /// Notice for the next page.
    pub const FLASH: &str = "flash";
}
