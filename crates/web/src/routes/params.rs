//! Query-string and form helpers shared by the listing pages.

use std::collections::BTreeSet;

use farmshare_core::{FilterError, ListingQuery, Money, SizeBucket, SortKey};
use serde::Deserialize;

use crate::error::AppError;
use crate::supabase::{FENCED, TOOL_SHED, TRAINING, WATER_ACCESS};

/// Filter parameters as they arrive from a listing page's filter form.
///
/// Every field is optional; amenities are separate checkboxes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingParams {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub min_price: String,
    #[serde(default)]
    pub max_price: String,
    #[serde(flatten)]
    pub amenities: AmenityChecks,
}

impl ListingParams {
    /// Build the filter pipeline input.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an unknown size or sort, an unparseable
    /// price, or a minimum above the maximum.
    pub fn to_query(&self) -> Result<ListingQuery, AppError> {
        let query = ListingQuery {
            search: self.search.trim().to_string(),
            category: self.category.trim().to_string(),
            location: self.location.trim().to_string(),
            size: SizeBucket::from_param(&self.size).map_err(bad_filter)?,
            amenities: self.amenities.labels(),
            min_price: parse_price(&self.min_price)?,
            max_price: parse_price(&self.max_price)?,
            sort: SortKey::from_param(&self.sort).map_err(bad_filter)?,
        };
        query.validate().map_err(bad_filter)?;
        Ok(query)
    }
}

fn bad_filter(err: FilterError) -> AppError {
    AppError::BadRequest(err.to_string())
}

fn parse_price(raw: &str) -> Result<Option<Money>, AppError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Money::parse(raw)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("price filter: {e}")))
}

/// Land amenity checkboxes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AmenityChecks {
    #[serde(default, deserialize_with = "checkbox")]
    pub water_access: bool,
    #[serde(default, deserialize_with = "checkbox")]
    pub tool_shed: bool,
    #[serde(default, deserialize_with = "checkbox")]
    pub fenced: bool,
    #[serde(default, deserialize_with = "checkbox")]
    pub training: bool,
}

impl AmenityChecks {
    /// Labels of the ticked boxes.
    #[must_use]
    pub fn labels(self) -> Vec<String> {
        [
            (self.water_access, WATER_ACCESS),
            (self.tool_shed, TOOL_SHED),
            (self.fenced, FENCED),
            (self.training, TRAINING),
        ]
        .into_iter()
        .filter(|(ticked, _)| *ticked)
        .map(|(_, label)| label.to_string())
        .collect()
    }

    /// Ticks from stored amenity names (water access is its own column).
    #[must_use]
    pub fn from_stored(water_access: bool, amenities: &[String]) -> Self {
        let has = |label: &str| amenities.iter().any(|a| a.eq_ignore_ascii_case(label));
        Self {
            water_access,
            tool_shed: has(TOOL_SHED),
            fenced: has(FENCED),
            training: has(TRAINING),
        }
    }
}

/// An HTML checkbox is present (`on`) when ticked and absent otherwise.
pub(crate) fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(matches!(value.as_str(), "on" | "true" | "1" | "yes"))
}

/// One `<option>` of a filter dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Dropdown options from the distinct values present in the listings.
pub fn distinct_options<'a>(
    values: impl IntoIterator<Item = &'a str>,
    selected: &str,
) -> Vec<SelectOption> {
    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|value| SelectOption {
            value: value.to_string(),
            label: value.to_string(),
            selected: value.eq_ignore_ascii_case(selected.trim()),
        })
        .collect()
}

/// Options for a fixed set of `(value, label)` pairs.
pub fn fixed_options(choices: &[(&str, &str)], selected: &str) -> Vec<SelectOption> {
    choices
        .iter()
        .map(|(value, label)| SelectOption {
            value: (*value).to_string(),
            label: (*label).to_string(),
            selected: *value == selected.trim(),
        })
        .collect()
}

/// Sort choices offered on every listing page (plots add size).
pub fn sort_options(selected: &str, include_size: bool) -> Vec<SelectOption> {
    let mut choices = vec![
        (SortKey::Recommended.as_str(), "Recommended"),
        (SortKey::PriceLowToHigh.as_str(), "Price: low to high"),
        (SortKey::PriceHighToLow.as_str(), "Price: high to low"),
        (SortKey::Newest.as_str(), "Newest"),
    ];
    if include_size {
        choices.push((SortKey::Size.as_str(), "Size: largest first"));
    }
    fixed_options(&choices, selected)
}

/// A same-site path to return to after a form post.
///
/// Anything that isn't a plain local path falls back to `fallback`.
pub fn local_path<'a>(raw: Option<&'a str>, fallback: &'a str) -> &'a str {
    raw.filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.contains('\\'))
        .unwrap_or(fallback)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(query: &str) -> ListingParams {
        let uri: axum::http::Uri = format!("/browse?{query}").parse().unwrap();
        axum::extract::Query::<ListingParams>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_empty_params_mean_no_filter() {
        let query = params("").to_query().unwrap();
        assert!(!query.is_filtered());
        assert_eq!(query.sort, SortKey::Recommended);
    }

    #[test]
    fn test_params_to_query() {
        let query = params("search=Garden&location=Medak&size=medium&sort=price-low&water_access=on&fenced=on")
            .to_query()
            .unwrap();
        assert_eq!(query.search, "Garden");
        assert_eq!(query.size, Some(SizeBucket::Medium));
        assert_eq!(query.sort, SortKey::PriceLowToHigh);
        assert_eq!(query.amenities, vec![WATER_ACCESS.to_string(), FENCED.to_string()]);
    }

    #[test]
    fn test_bad_params_are_rejected() {
        assert!(params("size=huge").to_query().is_err());
        assert!(params("sort=cheapest").to_query().is_err());
        assert!(params("min_price=500&max_price=100").to_query().is_err());
        assert!(params("min_price=abc").to_query().is_err());
    }

    #[test]
    fn test_distinct_options() {
        let options = distinct_options(["Medak", "Rangareddy", "Medak", ""], "medak");
        assert_eq!(options.len(), 2);
        assert!(options[0].selected);
        assert_eq!(options[1].value, "Rangareddy");
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path(Some("/cart"), "/marketplace"), "/cart");
        assert_eq!(local_path(Some("//evil.example"), "/marketplace"), "/marketplace");
        assert_eq!(local_path(Some("https://evil.example"), "/marketplace"), "/marketplace");
        assert_eq!(local_path(None, "/marketplace"), "/marketplace");
    }

    #[test]
    fn test_amenity_round_trip() {
        let checks = AmenityChecks::from_stored(true, &["fenced".to_string()]);
        assert!(checks.water_access && checks.fenced && !checks.tool_shed);
        assert_eq!(checks.labels(), vec![WATER_ACCESS.to_string(), FENCED.to_string()]);
    }
}
