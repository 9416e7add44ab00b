//! Type-safe money representation using decimal arithmetic.
//!
//! All prices on the marketplace are in Indian rupees. Amounts are kept as
//! [`Decimal`] so that `price × quantity` sums never accumulate float error.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency symbol used for display.
pub const CURRENCY_SYMBOL: &str = "₹";

/// Errors that can occur when parsing a [`Money`] amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is empty.
    #[error("amount cannot be empty")]
    Empty,
    /// The input is not a number.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// The amount is negative.
    #[error("amount cannot be negative")]
    Negative,
}

/// A non-negative rupee amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a user-entered amount such as `"12,000"`, `"₹60"` or `"24.5"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not numeric, or negative.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let cleaned: String = input
            .trim()
            .trim_start_matches(CURRENCY_SYMBOL)
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();

        if cleaned.is_empty() {
            return Err(MoneyError::Empty);
        }

        let amount =
            Decimal::from_str(&cleaned).map_err(|_| MoneyError::Invalid(input.to_owned()))?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }

        Ok(Self(amount.normalize()))
    }

    /// Multiply by a whole quantity (line totals, day counts).
    ///
    /// Saturates at the largest representable amount instead of panicking.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Multiply by a whole quantity, or `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Add two amounts, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Format for display, e.g. `₹12,000` or `₹60.50`.
    ///
    /// Whole amounts drop the fractional part; anything else is shown with
    /// two decimal places.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self.0.round_dp(2);
        let whole = rounded.trunc();
        let fraction = (rounded - whole).abs();

        let mut out = String::from(CURRENCY_SYMBOL);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            out.insert(0, '-');
        }
        out.push_str(&group_thousands(&whole.abs().to_string()));

        if !fraction.is_zero() {
            let cents = (fraction * Decimal::ONE_HUNDRED).round();
            out.push_str(&format!(".{:0>2}", cents.to_string()));
        }
        out
    }
}

/// Insert comma separators every three digits.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0.saturating_mul(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_display_whole_amount() {
        assert_eq!(Money::from_rupees(12_000).display(), "₹12,000");
        assert_eq!(Money::from_rupees(60).display(), "₹60");
        assert_eq!(Money::from_rupees(1_234_567).display(), "₹1,234,567");
        assert_eq!(Money::ZERO.display(), "₹0");
    }

    #[test]
    fn test_display_fractional_amount() {
        assert_eq!(Money::new(dec("60.5")).display(), "₹60.50");
        assert_eq!(Money::new(dec("2500.05")).display(), "₹2,500.05");
        assert_eq!(Money::new(dec("0.999")).display(), "₹1");
    }

    #[test]
    fn test_parse_user_input() {
        assert_eq!(Money::parse("12,000").unwrap(), Money::from_rupees(12_000));
        assert_eq!(Money::parse("₹60").unwrap(), Money::from_rupees(60));
        assert_eq!(Money::parse(" 24.5 ").unwrap(), Money::new(dec("24.5")));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Money::parse(""), Err(MoneyError::Empty));
        assert_eq!(Money::parse("₹"), Err(MoneyError::Empty));
        assert_eq!(Money::parse("-5"), Err(MoneyError::Negative));
        assert!(matches!(Money::parse("ten"), Err(MoneyError::Invalid(_))));
    }

    #[test]
    fn test_times_and_sum() {
        let price = Money::new(dec("60.25"));
        assert_eq!(price.times(4), Money::from_rupees(241));

        let total: Money = [Money::from_rupees(10), Money::from_rupees(15)]
            .iter()
            .sum();
        assert_eq!(total, Money::from_rupees(25));
    }

    #[test]
    fn test_arithmetic_saturates_on_overflow() {
        let huge = Money::parse("79228162514264337593543950335").unwrap();
        assert_eq!(huge.checked_times(2), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(huge.times(2), Money::new(Decimal::MAX));
        assert_eq!(huge + huge, Money::new(Decimal::MAX));

        let total: Money = [huge, Money::from_rupees(1)].into_iter().sum();
        assert_eq!(total, Money::new(Decimal::MAX));
        assert_eq!(
            Money::from_rupees(60).checked_times(3),
            Some(Money::from_rupees(180))
        );
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let from_number: Money = serde_json::from_str("18000").unwrap();
        let from_string: Money = serde_json::from_str("\"18000\"").unwrap();
        assert_eq!(from_number, from_string);
    }
}
