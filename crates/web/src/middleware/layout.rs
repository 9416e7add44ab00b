//! Per-page layout context.
//!
//! Every full page renders the same header: who is signed in, how many
//! items are in the cart and any pending notice. [`Page`] gathers that from
//! the request so handlers only build their own content.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::auth::current_user;
use super::csp::CspNonce;
use crate::models::{CurrentUser, Flash, load_cart};

/// Layout data for a full page render.
///
/// Extracting this consumes the pending flash notice, so only handlers that
/// actually render a page should take it.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub nonce: String,
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub flash: Option<Flash>,
}

impl Page {
    /// Whether someone is signed in.
    #[must_use]
    pub fn signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Dashboard link for the signed-in user.
    #[must_use]
    pub fn dashboard_path(&self) -> &'static str {
        self.user
            .as_ref()
            .map_or("/auth/login", |user| user.role.dashboard_path())
    }
}

impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CspNonce(nonce) = CspNonce::from_request_parts(parts, state).await?;
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self {
                nonce,
                ..Self::default()
            });
        };

        let cart_count = match load_cart(&session).await {
            Ok(cart) => cart.item_count(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load cart for layout");
                0
            }
        };

        Ok(Self {
            nonce,
            user: current_user(&session).await,
            cart_count,
            flash: Flash::take(&session).await,
        })
    }
}
