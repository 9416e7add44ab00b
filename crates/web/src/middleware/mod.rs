//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (reuse or mint `x-request-id`)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Security headers (CSP built from the nonce below)
//! 6. CSP nonce (per-request nonce for the layout's inline style)
//! 7. Rate limiting on auth and payment routes (governor)

pub mod auth;
pub mod csp;
pub mod layout;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalUser, RequireUser, clear_current_user, set_current_user};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use layout::Page;
pub use rate_limit::{auth_rate_limiter, payment_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
