//! The shopping cart.
//!
//! A cart is an ordered list of produce lines keyed by `id`. It lives in the
//! visitor's session, so it is `Serialize`/`Deserialize` and carries no
//! references to backend state. Prices are captured when the line is added
//! and are not re-checked until checkout.

use serde::{Deserialize, Serialize};

use crate::types::{Money, ProduceId};

/// Errors raised when a cart is used for checkout.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("your cart is empty")]
    Empty,
    #[error("item {0} is not in your cart")]
    UnknownItem(String),
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Line key, unique within the cart.
    pub id: String,
    pub name: String,
    /// Unit price at the time the line was added.
    pub price: Money,
    pub quantity: u32,
    /// Selling unit, e.g. `kg` or `dozen`.
    pub unit: String,
    /// Display name of the seller.
    pub farmer: String,
    pub produce_id: ProduceId,
}

impl CartItem {
    /// `price × quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// An item about to be added; the cart decides its quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub unit: String,
    pub farmer: String,
    pub produce_id: ProduceId,
}

impl NewCartItem {
    fn into_line(self) -> CartItem {
        CartItem {
            id: self.id,
            name: self.name,
            price: self.price,
            quantity: 1,
            unit: self.unit,
            farmer: self.farmer,
            produce_id: self.produce_id,
        }
    }
}

/// Session cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines (the badge count in the header).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Add one unit of `item`.
    ///
    /// If a line with the same id exists its quantity goes up by one and the
    /// stored price/name are left alone; otherwise the item is appended with
    /// quantity 1. Returns the line's new quantity.
    pub fn add(&mut self, item: NewCartItem) -> u32 {
        if let Some(line) = self.items.iter_mut().find(|line| line.id == item.id) {
            line.quantity = line.quantity.saturating_add(1);
            return line.quantity;
        }
        self.items.push(item.into_line());
        1
    }

    /// Remove the line with `id`. Returns `false` if there was no such line.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.id != id);
        self.items.len() != before
    }

    /// Set a line's quantity; zero or negative removes it.
    ///
    /// Unknown ids are ignored.
    pub fn set_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove(id);
            return;
        }
        if let Some(line) = self.items.iter_mut().find(|line| line.id == id) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// `Σ price × quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Lines to check out.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Empty`] if there is nothing to buy.
    pub fn checkout_lines(&self) -> Result<&[CartItem], CartError> {
        if self.items.is_empty() {
            return Err(CartError::Empty);
        }
        Ok(&self.items)
    }

    /// Remove a line that has been ordered.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownItem`] if the line is already gone.
    pub fn mark_ordered(&mut self, id: &str) -> Result<CartItem, CartError> {
        let index = self
            .items
            .iter()
            .position(|line| line.id == id)
            .ok_or_else(|| CartError::UnknownItem(id.to_owned()))?;
        Ok(self.items.remove(index))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tomatoes() -> NewCartItem {
        NewCartItem {
            id: "tomatoes".to_owned(),
            name: "Organic Tomatoes".to_owned(),
            price: Money::from_rupees(60),
            unit: "kg".to_owned(),
            farmer: "Ramesh Kumar".to_owned(),
            produce_id: ProduceId::new(uuid::Uuid::nil()),
        }
    }

    fn honey() -> NewCartItem {
        NewCartItem {
            id: "honey".to_owned(),
            name: "Wild Honey".to_owned(),
            price: Money::from_rupees(450),
            unit: "liter".to_owned(),
            farmer: "Lakshmi Devi".to_owned(),
            produce_id: ProduceId::random(),
        }
    }

    #[test]
    fn test_add_same_id_increments_quantity() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(tomatoes()), 1);
        assert_eq!(cart.add(tomatoes()), 2);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get("tomatoes").unwrap().quantity, 2);
    }

    #[test]
    fn test_add_keeps_first_price() {
        let mut cart = Cart::new();
        cart.add(tomatoes());
        let mut repriced = tomatoes();
        repriced.price = Money::from_rupees(80);
        cart.add(repriced);
        assert_eq!(cart.get("tomatoes").unwrap().price, Money::from_rupees(60));
    }

    #[test]
    fn test_set_quantity_non_positive_removes() {
        let mut cart = Cart::new();
        cart.add(tomatoes());
        cart.add(honey());

        cart.set_quantity("tomatoes", 0);
        assert!(cart.get("tomatoes").is_none());

        cart.set_quantity("honey", -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_unknown_id_is_noop() {
        let mut cart = Cart::new();
        cart.add(tomatoes());
        cart.set_quantity("mangoes", 4);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_total_and_count() {
        let mut cart = Cart::new();
        cart.add(tomatoes());
        cart.add(honey());
        cart.set_quantity("tomatoes", 3);

        assert_eq!(cart.total(), Money::from_rupees(60 * 3 + 450));
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_total_of_huge_prices_does_not_panic() {
        let mut cart = Cart::new();
        let mut gold = tomatoes();
        gold.price = Money::new(rust_decimal::Decimal::MAX);
        cart.add(gold);
        cart.add(honey());
        cart.set_quantity("tomatoes", 2);

        assert_eq!(cart.total(), Money::new(rust_decimal::Decimal::MAX));
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut cart = Cart::new();
        cart.add(tomatoes());
        assert!(cart.remove("tomatoes"));
        assert!(!cart.remove("tomatoes"));
    }

    #[test]
    fn test_clear_and_checkout_lines() {
        let mut cart = Cart::new();
        cart.add(honey());
        assert_eq!(cart.checkout_lines().unwrap().len(), 1);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::ZERO);
        assert_eq!(cart.checkout_lines(), Err(CartError::Empty));
    }

    #[test]
    fn test_mark_ordered() {
        let mut cart = Cart::new();
        cart.add(tomatoes());
        cart.add(honey());

        let line = cart.mark_ordered("honey").unwrap();
        assert_eq!(line.name, "Wild Honey");
        assert_eq!(cart.len(), 1);
        assert_eq!(
            cart.mark_ordered("honey"),
            Err(CartError::UnknownItem("honey".to_owned()))
        );
    }

    #[test]
    fn test_session_round_trip() {
        let mut cart = Cart::new();
        cart.add(tomatoes());
        cart.add(tomatoes());
        let json = serde_json::to_value(&cart).unwrap();
        let restored: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(restored, cart);
    }
}
