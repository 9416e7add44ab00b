//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, sign-in and account provisioning
//! - `listings` - Listing reads, creation and editing
//! - `checkout` - Payment summaries and the writes after a mock payment
//! - `dashboard` - Per-role dashboard reads
//!
//! Services borrow the backend client from [`crate::state::AppState`] and
//! are built per request:
//!
//! ```rust,ignore
//! let plots = ListingService::new(state.backend()).open_plots().await?;
//! ```

pub mod auth;
pub mod checkout;
pub mod dashboard;
pub mod listings;

pub use auth::{AuthError, AuthService, RegisterInput, RegisterOutcome};
pub use checkout::{CheckoutError, CheckoutService, PaymentSummary, SummaryLine};
pub use dashboard::{DashboardService, FarmerOverview, UserActivity, VendorOverview};
pub use listings::{ListingError, ListingService};
