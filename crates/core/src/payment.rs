//! Mock payment form validation.
//!
//! Nothing is charged. The checks mirror what a card or UPI form would do
//! client-side so that obviously bad input is rejected before any backend
//! rows are written.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// What a payment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// A land plot lease.
    Lease,
    /// An equipment rental.
    Equipment,
    /// The produce cart.
    Marketplace,
}

impl PaymentKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lease => "lease",
            Self::Equipment => "equipment",
            Self::Marketplace => "marketplace",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Lease => "Plot lease",
            Self::Equipment => "Equipment rental",
            Self::Marketplace => "Marketplace order",
        }
    }
}

impl std::fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentKind {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "lease" => Ok(Self::Lease),
            "equipment" => Ok(Self::Equipment),
            "marketplace" => Ok(Self::Marketplace),
            other => Err(PaymentError::UnknownKind(other.to_owned())),
        }
    }
}

/// Why a payment form was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("unknown payment type: {0}")]
    UnknownKind(String),
    #[error("unknown payment method: {0}")]
    UnknownMethod(String),
    #[error("card number must be 13 to 19 digits")]
    CardNumberLength,
    #[error("card number is not valid")]
    CardNumberChecksum,
    #[error("name on card is required")]
    MissingCardholder,
    #[error("expiry must be in MM/YY format")]
    InvalidExpiry,
    #[error("card has expired")]
    CardExpired,
    #[error("CVV must be 3 or 4 digits")]
    InvalidCvv,
    #[error("UPI ID must look like name@bank")]
    InvalidUpi,
}

/// A validated payment method. Only non-sensitive parts are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Card {
        last4: String,
        cardholder: String,
    },
    Upi {
        vpa: String,
    },
}

/// Raw card fields as typed into the form.
#[derive(Debug, Clone, Copy)]
pub struct CardInput<'a> {
    pub number: &'a str,
    pub cardholder: &'a str,
    pub expiry: &'a str,
    pub cvv: &'a str,
}

impl PaymentMethod {
    /// Validate card details against `today`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check: number length, Luhn checksum,
    /// cardholder, expiry format, expiry date, then CVV.
    pub fn card(input: CardInput<'_>, today: NaiveDate) -> Result<Self, PaymentError> {
        let digits: String = input
            .number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if !(13..=19).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PaymentError::CardNumberLength);
        }
        if !luhn_valid(&digits) {
            return Err(PaymentError::CardNumberChecksum);
        }

        let cardholder = input.cardholder.trim();
        if cardholder.is_empty() {
            return Err(PaymentError::MissingCardholder);
        }

        let (month, year) = parse_expiry(input.expiry)?;
        let this_month = (today.year(), today.month());
        if (year, month) < this_month {
            return Err(PaymentError::CardExpired);
        }

        let cvv = input.cvv.trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PaymentError::InvalidCvv);
        }

        let last4 = digits.get(digits.len() - 4..).unwrap_or_default().to_owned();
        Ok(Self::Card {
            last4,
            cardholder: cardholder.to_owned(),
        })
    }

    /// Validate a UPI virtual payment address such as `priya@okaxis`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidUpi`] if the address is malformed.
    pub fn upi(vpa: &str) -> Result<Self, PaymentError> {
        let vpa = vpa.trim();
        let (name, handle) = vpa.split_once('@').ok_or(PaymentError::InvalidUpi)?;

        let name_ok = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        let handle_ok = handle.len() >= 2 && handle.chars().all(|c| c.is_ascii_alphabetic());
        if !name_ok || !handle_ok {
            return Err(PaymentError::InvalidUpi);
        }

        Ok(Self::Upi {
            vpa: vpa.to_ascii_lowercase(),
        })
    }

    /// Short description for receipts, e.g. `Card ending 4242`.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Card { last4, .. } => format!("Card ending {last4}"),
            Self::Upi { vpa } => format!("UPI {vpa}"),
        }
    }
}

/// Luhn checksum over a string of ASCII digits.
#[must_use]
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, byte) in digits.bytes().rev().enumerate() {
        if !byte.is_ascii_digit() {
            return false;
        }
        let mut d = u32::from(byte - b'0');
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    !digits.is_empty() && sum % 10 == 0
}

/// Parse `MM/YY` into `(month, full_year)`.
fn parse_expiry(expiry: &str) -> Result<(u32, i32), PaymentError> {
    let (month, year) = expiry
        .trim()
        .split_once('/')
        .ok_or(PaymentError::InvalidExpiry)?;
    let (month, year) = (month.trim(), year.trim());
    if month.len() != 2 || year.len() != 2 {
        return Err(PaymentError::InvalidExpiry);
    }

    let month: u32 = month.parse().map_err(|_| PaymentError::InvalidExpiry)?;
    let year: i32 = year.parse().map_err(|_| PaymentError::InvalidExpiry)?;
    if !(1..=12).contains(&month) {
        return Err(PaymentError::InvalidExpiry);
    }
    Ok((month, 2000 + year))
}
