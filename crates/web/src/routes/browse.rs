//! Land plot browsing and plot details.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use farmshare_core::{LandListingId, LandStatus, LeaseQuote, SizeBucket, quote::LEASE_TERM_MONTHS};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::Page;
use crate::routes::params::{AmenityChecks, ListingParams, SelectOption, distinct_options, fixed_options, sort_options};
use crate::services::ListingService;
use crate::state::AppState;
use crate::supabase::{AccessToken, LandListing};

// =============================================================================
// View Types
// =============================================================================

/// A plot card on the browse page.
#[derive(Clone)]
pub struct PlotCardView {
    pub id: String,
    pub title: String,
    pub location: String,
    pub owner: String,
    pub area: String,
    pub rate: String,
    pub monthly: String,
    pub soil_type: Option<String>,
    pub amenities: Vec<String>,
}

impl From<&LandListing> for PlotCardView {
    fn from(plot: &LandListing) -> Self {
        Self {
            id: plot.id.to_string(),
            title: plot.title.clone(),
            location: plot.location.clone(),
            owner: owner_name(plot),
            area: format!("{} sq ft", plot.available_area_sqft),
            rate: format!("{}/sq ft/month", plot.price_per_sqft_monthly.display()),
            monthly: plot
                .price_per_sqft_monthly
                .times(plot.available_area_sqft)
                .display(),
            soil_type: plot.soil_type.clone(),
            amenities: plot.amenity_labels(),
        }
    }
}

fn owner_name(plot: &LandListing) -> String {
    plot.owner
        .as_ref()
        .map_or_else(|| "FarmShare landowner".to_string(), |o| o.full_name.clone())
}

/// District part of a location (`Medak, Telangana` gives `Medak`).
fn district(location: &str) -> &str {
    location.split(',').next().unwrap_or(location).trim()
}

// =============================================================================
// Templates
// =============================================================================

/// Browse page template.
#[derive(Template, WebTemplate)]
#[template(path = "browse/index.html")]
pub struct BrowseTemplate {
    pub page: Page,
    pub plots: Vec<PlotCardView>,
    pub search: String,
    pub locations: Vec<SelectOption>,
    pub sizes: Vec<SelectOption>,
    pub sorts: Vec<SelectOption>,
    pub amenities: AmenityChecks,
    pub filtered: bool,
}

/// Plot detail template.
#[derive(Template, WebTemplate)]
#[template(path = "browse/plot.html")]
pub struct PlotTemplate {
    pub page: Page,
    pub plot: PlotCardView,
    pub description: Option<String>,
    pub term_months: u32,
    pub term_total: String,
    pub start: String,
    pub end: String,
    pub available: bool,
}

// =============================================================================
// Routes
// =============================================================================

/// Browse open plots with search, location, size, amenity and sort filters.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse> {
    let query = params.to_query()?;
    let plots = ListingService::new(state.backend()).open_plots().await?;

    let locations = distinct_options(plots.iter().map(|p| district(&p.location)), &params.location);
    let shown: Vec<PlotCardView> = query.apply(plots).iter().map(PlotCardView::from).collect();
    tracing::debug!(shown = shown.len(), "Filtered plots");

    Ok(BrowseTemplate {
        page,
        plots: shown,
        search: params.search.clone(),
        locations,
        sizes: fixed_options(
            &[
                (SizeBucket::Small.as_str(), "Small (under 500 sq ft)"),
                (SizeBucket::Medium.as_str(), "Medium (500 to 750 sq ft)"),
                (SizeBucket::Large.as_str(), "Large (over 750 sq ft)"),
            ],
            &params.size,
        ),
        sorts: sort_options(&params.sort, true),
        amenities: params.amenities,
        filtered: query.is_filtered(),
    })
}

/// Plot details with a lease quote starting today.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: Page,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = LandListingId::parse(&id).map_err(|_| AppError::NotFound(format!("plot {id}")))?;
    let plot = ListingService::new(state.backend())
        .plot(id, AccessToken::Anon)
        .await?;

    let quote = LeaseQuote::new(
        plot.price_per_sqft_monthly,
        plot.available_area_sqft,
        Utc::now().date_naive(),
    );

    Ok(PlotTemplate {
        page,
        plot: PlotCardView::from(&plot),
        description: plot.description.clone(),
        term_months: LEASE_TERM_MONTHS,
        term_total: quote.term_total().display(),
        start: quote.start.format("%d %b %Y").to_string(),
        end: quote.end.format("%d %b %Y").to_string(),
        available: plot.status == LandStatus::Active && plot.available_area_sqft > 0,
    })
}
