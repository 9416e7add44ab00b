//! Data models for the web server.
//!
//! Marketplace rows come from the backend (see [`crate::supabase::types`]);
//! these are the types kept in the visitor's session.

pub mod session;

pub use session::{
    CheckoutDetails, CurrentUser, Flash, FlashKind, PaymentToken, keys as session_keys, load_cart,
    save_cart,
};
