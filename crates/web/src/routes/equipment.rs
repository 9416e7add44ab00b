//! Equipment rental listings.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use farmshare_core::Availability;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::Page;
use crate::routes::params::{ListingParams, SelectOption, distinct_options, sort_options};
use crate::services::ListingService;
use crate::state::AppState;
use crate::supabase::EquipmentListing;

/// An equipment card.
#[derive(Clone)]
pub struct EquipmentCardView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub location: Option<String>,
    pub condition: Option<String>,
    pub price_per_day: String,
    pub status: Availability,
    pub available: bool,
}

impl From<&EquipmentListing> for EquipmentCardView {
    fn from(item: &EquipmentListing) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            category: item.category.clone(),
            location: item.location.clone(),
            condition: item.condition.clone(),
            price_per_day: item.price_per_day.display(),
            status: item.availability_status,
            available: item.availability_status == Availability::Available,
        }
    }
}

/// Equipment page template.
#[derive(Template, WebTemplate)]
#[template(path = "equipment/index.html")]
pub struct EquipmentTemplate {
    pub page: Page,
    pub items: Vec<EquipmentCardView>,
    pub search: String,
    pub categories: Vec<SelectOption>,
    pub locations: Vec<SelectOption>,
    pub sorts: Vec<SelectOption>,
    pub min_price: String,
    pub max_price: String,
    pub filtered: bool,
}

/// Browse equipment with search, category, location, price and sort
/// filters. Only available items offer a rent button.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse> {
    let query = params.to_query()?;
    let items = ListingService::new(state.backend()).equipment().await?;

    let categories = distinct_options(items.iter().map(|i| i.category.as_str()), &params.category);
    let locations = distinct_options(
        items.iter().filter_map(|i| i.location.as_deref()),
        &params.location,
    );
    let shown = query
        .apply(items)
        .iter()
        .map(EquipmentCardView::from)
        .collect();

    Ok(EquipmentTemplate {
        page,
        items: shown,
        search: params.search.clone(),
        categories,
        locations,
        sorts: sort_options(&params.sort, false),
        min_price: params.min_price.clone(),
        max_price: params.max_price.clone(),
        filtered: query.is_filtered(),
    })
}
