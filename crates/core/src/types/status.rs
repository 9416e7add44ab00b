//! Status enums for listings and agreements.
//!
//! The backend stores statuses as free text. Listing statuses drive business
//! rules (a leased plot can't be leased again) so they are strict; agreement
//! statuses are display-only and tolerate values this build doesn't know.

use serde::{Deserialize, Serialize};

/// Land plot listing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LandStatus {
    #[default]
    Active,
    Leased,
}

/// Equipment availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Available,
    Rented,
    Maintenance,
}

/// Produce listing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProduceStatus {
    #[default]
    Active,
    SoldOut,
}

/// Plot lease status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Equipment rental status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    #[default]
    Active,
    Returned,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Produce order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Stock left after a sale and the status that goes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockUpdate {
    /// Units remaining, never negative.
    pub remaining: u32,
    pub status: ProduceStatus,
}

impl LandStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Leased => "leased",
        }
    }
}

impl Availability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Rented => "rented",
            Self::Maintenance => "maintenance",
        }
    }
}

impl ProduceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::SoldOut => "sold_out",
        }
    }

    /// Compute stock after `sold` units leave an `available` quantity.
    ///
    /// Overselling clamps to zero; a listing with nothing left is `sold_out`.
    #[must_use]
    pub fn after_sale(available: u32, sold: u32) -> StockUpdate {
        let remaining = available.saturating_sub(sold);
        let status = if remaining == 0 {
            Self::SoldOut
        } else {
            Self::Active
        };
        StockUpdate { remaining, status }
    }
}

impl LeaseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl RentalStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(
    LandStatus,
    Availability,
    ProduceStatus,
    LeaseStatus,
    RentalStatus,
    OrderStatus
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_after_sale_partial() {
        let update = ProduceStatus::after_sale(20, 5);
        assert_eq!(update.remaining, 15);
        assert_eq!(update.status, ProduceStatus::Active);
    }

    #[test]
    fn test_after_sale_exhausts_stock() {
        assert_eq!(
            ProduceStatus::after_sale(5, 5).status,
            ProduceStatus::SoldOut
        );
        let oversold = ProduceStatus::after_sale(3, 10);
        assert_eq!(oversold.remaining, 0);
        assert_eq!(oversold.status, ProduceStatus::SoldOut);
    }

    #[test]
    fn test_unknown_agreement_status_tolerated() {
        let status: LeaseStatus = serde_json::from_str("\"disputed\"").unwrap();
        assert_eq!(status, LeaseStatus::Unknown);
        let status: OrderStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn test_listing_status_is_strict() {
        assert!(serde_json::from_str::<LandStatus>("\"archived\"").is_err());
        let status: ProduceStatus = serde_json::from_str("\"sold_out\"").unwrap();
        assert_eq!(status.to_string(), "sold_out");
    }
}
