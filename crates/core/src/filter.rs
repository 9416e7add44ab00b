//! Listing filter/sort pipeline.
//!
//! Browse pages fetch a table's rows and run them through a [`ListingQuery`]:
//! text search, category/location equality, size bucket, amenities and price
//! range are ANDed together, then the survivors are sorted by one key.
//! Everything is recomputed per request.

use core::cmp::Reverse;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::types::Money;

/// Errors from parsing filter parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown sort order: {0}")]
    UnknownSort(String),
    #[error("unknown plot size: {0}")]
    UnknownSize(String),
    #[error("minimum price is above maximum price")]
    InvalidPriceRange,
}

/// A row that can go through the pipeline.
///
/// Only `searchable` and `price` are required; the other hooks default to
/// "not applicable", which means a query that sets the matching criterion
/// filters the row out.
pub trait Filterable {
    /// Fields matched by the free-text search.
    fn searchable(&self) -> Vec<&str>;

    /// Price used for price range and price sorts.
    fn price(&self) -> Money;

    fn category(&self) -> Option<&str> {
        None
    }

    fn location(&self) -> Option<&str> {
        None
    }

    /// Area in square feet used for size buckets and the size sort.
    fn size_sqft(&self) -> Option<u32> {
        None
    }

    fn has_amenity(&self, _amenity: &str) -> bool {
        false
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Plot size buckets shown on the browse page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeBucket {
    /// Under 500 sq ft.
    Small,
    /// 500 to 750 sq ft inclusive.
    Medium,
    /// Over 750 sq ft.
    Large,
}

impl SizeBucket {
    pub const SMALL_LIMIT: u32 = 500;
    pub const LARGE_LIMIT: u32 = 750;

    #[must_use]
    pub const fn contains(self, sqft: u32) -> bool {
        match self {
            Self::Small => sqft < Self::SMALL_LIMIT,
            Self::Medium => sqft >= Self::SMALL_LIMIT && sqft <= Self::LARGE_LIMIT,
            Self::Large => sqft > Self::LARGE_LIMIT,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    /// Parse a query parameter; `""` and `"all"` mean no bucket.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownSize`] for anything else.
    pub fn from_param(param: &str) -> Result<Option<Self>, FilterError> {
        if is_unset(param) {
            return Ok(None);
        }
        param.parse().map(Some)
    }
}

impl FromStr for SizeBucket {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(FilterError::UnknownSize(s.to_owned())),
        }
    }
}

/// Sort order for listing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    /// Keep the backend's order.
    #[default]
    Recommended,
    PriceLowToHigh,
    PriceHighToLow,
    /// Largest first.
    Size,
    Newest,
}

impl SortKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recommended => "recommended",
            Self::PriceLowToHigh => "price-low",
            Self::PriceHighToLow => "price-high",
            Self::Size => "size",
            Self::Newest => "newest",
        }
    }

    /// Parse a query parameter; empty means the default order.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownSort`] for unrecognized values.
    pub fn from_param(param: &str) -> Result<Self, FilterError> {
        if param.trim().is_empty() {
            return Ok(Self::default());
        }
        param.parse()
    }
}

impl FromStr for SortKey {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recommended" => Ok(Self::Recommended),
            "price-low" => Ok(Self::PriceLowToHigh),
            "price-high" => Ok(Self::PriceHighToLow),
            "size" => Ok(Self::Size),
            "newest" => Ok(Self::Newest),
            _ => Err(FilterError::UnknownSort(s.to_owned())),
        }
    }
}

/// Filter and sort criteria for one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    /// Case-insensitive substring matched against any searchable field.
    pub search: String,
    /// `""` or `"all"` for any category.
    pub category: String,
    /// `""` or `"all"` for any location.
    pub location: String,
    pub size: Option<SizeBucket>,
    /// Every listed amenity must be present.
    pub amenities: Vec<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: SortKey,
}

impl ListingQuery {
    /// Check the query is self-consistent.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidPriceRange`] if `min_price > max_price`.
    pub fn validate(&self) -> Result<(), FilterError> {
        match (self.min_price, self.max_price) {
            (Some(min), Some(max)) if min > max => Err(FilterError::InvalidPriceRange),
            _ => Ok(()),
        }
    }

    /// Whether a single row passes every filter.
    #[must_use]
    pub fn matches<T: Filterable>(&self, item: &T) -> bool {
        self.matches_search(item)
            && self.matches_category(item)
            && self.matches_location(item)
            && self.matches_size(item)
            && self.amenities.iter().all(|amenity| item.has_amenity(amenity))
            && self.matches_price(item)
    }

    /// Filter then sort. The sort is stable, so ties keep backend order.
    #[must_use]
    pub fn apply<T: Filterable>(&self, items: Vec<T>) -> Vec<T> {
        let mut kept: Vec<T> = items.into_iter().filter(|item| self.matches(item)).collect();
        match self.sort {
            SortKey::Recommended => {}
            SortKey::PriceLowToHigh => kept.sort_by_key(|item| item.price()),
            SortKey::PriceHighToLow => kept.sort_by_key(|item| Reverse(item.price())),
            SortKey::Size => kept.sort_by_key(|item| Reverse(item.size_sqft())),
            SortKey::Newest => kept.sort_by_key(|item| Reverse(item.created_at())),
        }
        kept
    }

    /// Whether any filter is set (drives the "clear filters" link).
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.search.trim().is_empty()
            || !is_unset(&self.category)
            || !is_unset(&self.location)
            || self.size.is_some()
            || !self.amenities.is_empty()
            || self.min_price.is_some()
            || self.max_price.is_some()
    }

    fn matches_search<T: Filterable>(&self, item: &T) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        item.searchable()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    fn matches_category<T: Filterable>(&self, item: &T) -> bool {
        if is_unset(&self.category) {
            return true;
        }
        item.category()
            .is_some_and(|category| normalize(category) == normalize(&self.category))
    }

    fn matches_location<T: Filterable>(&self, item: &T) -> bool {
        if is_unset(&self.location) {
            return true;
        }
        let wanted = normalize(&self.location);
        item.location().is_some_and(|location| {
            normalize(location) == wanted
                || location.split(',').any(|part| normalize(part) == wanted)
        })
    }

    fn matches_size<T: Filterable>(&self, item: &T) -> bool {
        self.size.is_none_or(|bucket| {
            item.size_sqft().is_some_and(|sqft| bucket.contains(sqft))
        })
    }

    fn matches_price<T: Filterable>(&self, item: &T) -> bool {
        let price = item.price();
        self.min_price.is_none_or(|min| price >= min)
            && self.max_price.is_none_or(|max| price <= max)
    }
}

/// `""` and `"all"` both mean "no filter".
fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("all")
}

/// Case-fold and treat hyphens as spaces, so `ranga-reddy` matches
/// `Ranga Reddy` and `heavy-machinery` matches `Heavy Machinery`.
fn normalize(value: &str) -> String {
    value.trim().to_lowercase().replace('-', " ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Plot {
        title: &'static str,
        location: &'static str,
        price: i64,
        sqft: u32,
        amenities: &'static [&'static str],
    }

    impl Filterable for Plot {
        fn searchable(&self) -> Vec<&str> {
            vec![self.title, self.location]
        }

        fn price(&self) -> Money {
            Money::from_rupees(self.price)
        }

        fn location(&self) -> Option<&str> {
            Some(self.location)
        }

        fn size_sqft(&self) -> Option<u32> {
            Some(self.sqft)
        }

        fn has_amenity(&self, amenity: &str) -> bool {
            self.amenities.iter().any(|a| a.eq_ignore_ascii_case(amenity))
        }
    }

    fn plots() -> Vec<Plot> {
        vec![
            Plot {
                title: "Sunny Garden Plot",
                location: "Medak, Telangana",
                price: 4000,
                sqft: 400,
                amenities: &["Water Access", "Fenced"],
            },
            Plot {
                title: "Riverside Acre",
                location: "Ranga Reddy, Telangana",
                price: 9000,
                sqft: 900,
                amenities: &["Water Access", "Tool Shed"],
            },
            Plot {
                title: "Orchard Corner",
                location: "Nizamabad, Telangana",
                price: 6000,
                sqft: 600,
                amenities: &[],
            },
            Plot {
                title: "Medak Terrace",
                location: "Karimnagar, Telangana",
                price: 6000,
                sqft: 750,
                amenities: &["Offers Training"],
            },
        ]
    }

    fn titles(rows: &[Plot]) -> Vec<&'static str> {
        rows.iter().map(|p| p.title).collect()
    }

    #[test]
    fn test_empty_query_keeps_order() {
        let rows = ListingQuery::default().apply(plots());
        assert_eq!(titles(&rows), titles(&plots()));
    }

    #[test]
    fn test_search_is_case_insensitive_over_fields() {
        let query = ListingQuery {
            search: "MEDAK".to_owned(),
            ..ListingQuery::default()
        };
        let rows = query.apply(plots());
        assert_eq!(titles(&rows), ["Sunny Garden Plot", "Medak Terrace"]);
    }

    #[test]
    fn test_location_matches_district_segment() {
        let query = ListingQuery {
            location: "ranga-reddy".to_owned(),
            ..ListingQuery::default()
        };
        assert_eq!(titles(&query.apply(plots())), ["Riverside Acre"]);

        let all = ListingQuery {
            location: "all".to_owned(),
            ..ListingQuery::default()
        };
        assert_eq!(all.apply(plots()).len(), 4);
    }

    #[test]
    fn test_size_buckets() {
        assert!(SizeBucket::Small.contains(499));
        assert!(SizeBucket::Medium.contains(500));
        assert!(SizeBucket::Medium.contains(750));
        assert!(SizeBucket::Large.contains(751));

        let query = ListingQuery {
            size: Some(SizeBucket::Medium),
            ..ListingQuery::default()
        };
        assert_eq!(titles(&query.apply(plots())), ["Orchard Corner", "Medak Terrace"]);
    }

    #[test]
    fn test_amenities_all_required() {
        let query = ListingQuery {
            amenities: vec!["Water Access".to_owned(), "Tool Shed".to_owned()],
            ..ListingQuery::default()
        };
        assert_eq!(titles(&query.apply(plots())), ["Riverside Acre"]);
    }

    #[test]
    fn test_criteria_combine_with_and() {
        let query = ListingQuery {
            search: "telangana".to_owned(),
            amenities: vec!["Water Access".to_owned()],
            max_price: Some(Money::from_rupees(5000)),
            ..ListingQuery::default()
        };
        assert_eq!(titles(&query.apply(plots())), ["Sunny Garden Plot"]);
    }

    #[test]
    fn test_price_sorts_are_stable() {
        let low = ListingQuery {
            sort: SortKey::PriceLowToHigh,
            ..ListingQuery::default()
        };
        assert_eq!(
            titles(&low.apply(plots())),
            ["Sunny Garden Plot", "Orchard Corner", "Medak Terrace", "Riverside Acre"]
        );

        let high = ListingQuery {
            sort: SortKey::PriceHighToLow,
            ..ListingQuery::default()
        };
        assert_eq!(
            titles(&high.apply(plots())),
            ["Riverside Acre", "Orchard Corner", "Medak Terrace", "Sunny Garden Plot"]
        );
    }

    #[test]
    fn test_size_sort_largest_first() {
        let query = ListingQuery {
            sort: SortKey::Size,
            ..ListingQuery::default()
        };
        assert_eq!(
            titles(&query.apply(plots())),
            ["Riverside Acre", "Medak Terrace", "Orchard Corner", "Sunny Garden Plot"]
        );
    }

    #[test]
    fn test_param_parsing() {
        assert_eq!(SizeBucket::from_param("all").unwrap(), None);
        assert_eq!(SizeBucket::from_param("Large").unwrap(), Some(SizeBucket::Large));
        assert!(SizeBucket::from_param("huge").is_err());

        assert_eq!(SortKey::from_param("").unwrap(), SortKey::Recommended);
        assert_eq!(SortKey::from_param("price-high").unwrap(), SortKey::PriceHighToLow);
        assert_eq!(
            SortKey::from_param("cheapest"),
            Err(FilterError::UnknownSort("cheapest".to_owned()))
        );
    }

    #[test]
    fn test_validate_price_range() {
        let query = ListingQuery {
            min_price: Some(Money::from_rupees(10)),
            max_price: Some(Money::from_rupees(5)),
            ..ListingQuery::default()
        };
        assert_eq!(query.validate(), Err(FilterError::InvalidPriceRange));
        assert!(query.is_filtered());
        assert!(!ListingQuery::default().is_filtered());
    }
}
