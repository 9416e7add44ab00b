//! Lease and rental price quotes.
//!
//! Amounts shown on the payment page and written to agreement rows are
//! computed here from listing prices, never taken from the form.

use chrono::{Days, NaiveDate};

use crate::types::Money;

/// Length of a plot lease.
pub const LEASE_TERM_MONTHS: u32 = 6;
/// Lease end date offset from the start date.
pub const LEASE_TERM_DAYS: u64 = 180;
/// Length of an equipment rental.
pub const RENTAL_DAYS: u32 = 5;

/// Quote for leasing a whole plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseQuote {
    pub area_sqft: u32,
    pub price_per_sqft_monthly: Money,
    /// Rent per month for the whole plot.
    pub monthly: Money,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LeaseQuote {
    #[must_use]
    pub fn new(price_per_sqft_monthly: Money, area_sqft: u32, start: NaiveDate) -> Self {
        Self {
            area_sqft,
            price_per_sqft_monthly,
            monthly: price_per_sqft_monthly.times(area_sqft),
            start,
            end: add_days(start, LEASE_TERM_DAYS),
        }
    }

    /// Due at signing: the first month's rent.
    #[must_use]
    pub const fn amount_due(&self) -> Money {
        self.monthly
    }

    /// Rent over the full term.
    #[must_use]
    pub fn term_total(&self) -> Money {
        self.monthly.times(LEASE_TERM_MONTHS)
    }
}

/// Quote for renting one piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalQuote {
    pub price_per_day: Money,
    pub days: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RentalQuote {
    #[must_use]
    pub fn new(price_per_day: Money, start: NaiveDate) -> Self {
        Self {
            price_per_day,
            days: RENTAL_DAYS,
            start,
            end: add_days(start, u64::from(RENTAL_DAYS)),
        }
    }

    #[must_use]
    pub fn total(&self) -> Money {
        self.price_per_day.times(self.days)
    }
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}
