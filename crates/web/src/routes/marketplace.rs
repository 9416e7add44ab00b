//! Produce marketplace.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use farmshare_core::ProduceStatus;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::Page;
use crate::routes::params::{ListingParams, SelectOption, distinct_options, sort_options};
use crate::services::ListingService;
use crate::state::AppState;
use crate::supabase::ProduceListing;

/// A produce card.
#[derive(Clone)]
pub struct ProduceCardView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub seller: String,
    pub price: String,
    pub unit: String,
    pub quantity_available: u32,
    pub organic: bool,
    pub status: ProduceStatus,
    pub in_stock: bool,
}

impl From<&ProduceListing> for ProduceCardView {
    fn from(item: &ProduceListing) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            category: item.category.clone(),
            seller: item.seller_name().to_string(),
            price: item.price_per_unit.display(),
            unit: item.unit.clone(),
            quantity_available: item.quantity_available,
            organic: item.organic.unwrap_or(false),
            status: item.status,
            in_stock: item.in_stock(),
        }
    }
}

/// Marketplace page template.
#[derive(Template, WebTemplate)]
#[template(path = "marketplace/index.html")]
pub struct MarketplaceTemplate {
    pub page: Page,
    pub items: Vec<ProduceCardView>,
    pub search: String,
    pub categories: Vec<SelectOption>,
    pub sorts: Vec<SelectOption>,
    pub min_price: String,
    pub max_price: String,
    pub filtered: bool,
}

/// Browse produce with search, category, price and sort filters.
/// Out-of-stock items are shown without an add-to-cart button.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse> {
    let query = params.to_query()?;
    let items = ListingService::new(state.backend()).produce().await?;

    let categories = distinct_options(items.iter().map(|i| i.category.as_str()), &params.category);
    let shown = query
        .apply(items)
        .iter()
        .map(ProduceCardView::from)
        .collect();

    Ok(MarketplaceTemplate {
        page,
        items: shown,
        search: params.search.clone(),
        categories,
        sorts: sort_options(&params.sort, false),
        min_price: params.min_price.clone(),
        max_price: params.max_price.clone(),
        filtered: query.is_filtered(),
    })
}
