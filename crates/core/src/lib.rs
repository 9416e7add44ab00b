//! FarmShare Core - Shared types and pure marketplace logic.
//!
//! This crate provides the building blocks used by every FarmShare component:
//! - `web` - Public marketplace site (browse, cart, dashboards, payment)
//! - `cli` - Command-line tools for migrations and demo data
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here is synchronous and deterministic,
//! which keeps it usable from handlers, the CLI, and tests alike.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, money, emails, roles and statuses
//! - [`cart`] - The session cart store
//! - [`filter`] - Listing filter/sort pipeline
//! - [`payment`] - Mock payment form validation
//! - [`quote`] - Lease and rental price quotes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod filter;
pub mod payment;
pub mod quote;
pub mod types;

pub use cart::{Cart, CartError, CartItem, NewCartItem};
pub use filter::{FilterError, Filterable, ListingQuery, SizeBucket, SortKey};
pub use payment::{CardInput, PaymentError, PaymentKind, PaymentMethod};
pub use quote::{LeaseQuote, RentalQuote};
pub use types::*;
