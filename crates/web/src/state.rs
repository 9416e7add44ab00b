//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::WebConfig;
use crate::supabase::SupabaseClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    pool: PgPool,
    backend: SupabaseClient,
    payment_claims: PaymentClaims,
}

impl AppState {
    /// Create the application state.
    ///
    /// `pool` backs the session store and readiness check only; marketplace
    /// data is read from and written to the managed backend.
    #[must_use]
    pub fn new(config: WebConfig, pool: PgPool) -> Self {
        let backend = SupabaseClient::new(&config.supabase, config.listing_cache_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                backend,
                payment_claims: PaymentClaims::new(PAYMENT_CLAIM_TTL),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Session-store connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Client for the managed backend.
    #[must_use]
    pub fn backend(&self) -> &SupabaseClient {
        &self.inner.backend
    }

    /// Payment tokens already taken by a submission.
    #[must_use]
    pub fn payment_claims(&self) -> &PaymentClaims {
        &self.inner.payment_claims
    }
}

/// How long a used payment token is remembered.
const PAYMENT_CLAIM_TTL: Duration = Duration::from_secs(60 * 60);

/// Process-wide record of spent payment tokens.
///
/// The session copy of a token is only written back once a response is
/// sent, so two overlapping submissions of one form both still see it.
/// Claiming here is atomic across requests.
#[derive(Clone)]
pub struct PaymentClaims {
    claimed: Cache<String, ()>,
}

impl PaymentClaims {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let claimed = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(ttl)
            .build();
        Self { claimed }
    }

    /// Returns `true` for exactly one caller per token.
    pub async fn claim(&self, token: &str) -> bool {
        self.claimed
            .entry(token.to_owned())
            .or_insert(())
            .await
            .is_fresh()
    }
}
