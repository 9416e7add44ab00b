//! Role dashboards.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use farmshare_core::{
    AppRole, Availability, LandStatus, LeaseStatus, OrderStatus, ProduceStatus, RentalStatus,
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Page, RequireUser};
use crate::models::CurrentUser;
use crate::services::DashboardService;
use crate::state::AppState;
use crate::supabase::{
    EquipmentListing, EquipmentRental, LandListing, Order, PlotLease, ProduceListing,
};

// =============================================================================
// View Types
// =============================================================================

#[derive(Clone)]
pub struct LeaseView {
    pub title: String,
    pub location: String,
    pub area: String,
    pub monthly: String,
    pub start: String,
    pub end: String,
    pub status: LeaseStatus,
}

impl From<&PlotLease> for LeaseView {
    fn from(lease: &PlotLease) -> Self {
        let (title, location) = lease.plot.as_ref().map_or_else(
            || ("Plot".to_string(), String::new()),
            |p| (p.title.clone(), p.location.clone().unwrap_or_default()),
        );
        Self {
            title,
            location,
            area: format!("{} sq ft", lease.area_sqft),
            monthly: lease.monthly_price.display(),
            start: lease.start_date.format("%d %b %Y").to_string(),
            end: lease.end_date.format("%d %b %Y").to_string(),
            status: lease.status,
        }
    }
}

#[derive(Clone)]
pub struct RentalView {
    pub name: String,
    pub category: String,
    pub total: String,
    pub start: String,
    pub end: String,
    pub status: RentalStatus,
}

impl From<&EquipmentRental> for RentalView {
    fn from(rental: &EquipmentRental) -> Self {
        let (name, category) = rental.equipment.as_ref().map_or_else(
            || ("Equipment".to_string(), String::new()),
            |e| (e.name.clone(), e.category.clone().unwrap_or_default()),
        );
        Self {
            name,
            category,
            total: rental.total_price.display(),
            start: rental.start_date.format("%d %b %Y").to_string(),
            end: rental.end_date.format("%d %b %Y").to_string(),
            status: rental.status,
        }
    }
}

#[derive(Clone)]
pub struct OrderView {
    pub name: String,
    pub quantity: String,
    pub total: String,
    pub placed: String,
    pub status: OrderStatus,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let (name, unit) = order.produce.as_ref().map_or_else(
            || ("Produce".to_string(), String::new()),
            |p| (p.name.clone(), p.unit.clone()),
        );
        Self {
            name,
            quantity: format!("{} {unit}", order.quantity).trim_end().to_string(),
            total: order.total_price.display(),
            placed: order.created_at.format("%d %b %Y").to_string(),
            status: order.status,
        }
    }
}

/// A row in "my produce".
#[derive(Clone)]
pub struct ProduceRowView {
    pub id: String,
    pub name: String,
    pub stock: String,
    pub price: String,
    pub status: ProduceStatus,
}

impl From<&ProduceListing> for ProduceRowView {
    fn from(item: &ProduceListing) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            stock: format!("{} {}", item.quantity_available, item.unit),
            price: format!("{}/{}", item.price_per_unit.display(), item.unit),
            status: item.status,
        }
    }
}

/// A row in "my plots".
#[derive(Clone)]
pub struct PlotRowView {
    pub id: String,
    pub title: String,
    pub location: String,
    pub area: String,
    pub rate: String,
    pub status: LandStatus,
}

impl From<&LandListing> for PlotRowView {
    fn from(plot: &LandListing) -> Self {
        Self {
            id: plot.id.to_string(),
            title: plot.title.clone(),
            location: plot.location.clone(),
            area: format!(
                "{} of {} sq ft available",
                plot.available_area_sqft, plot.total_area_sqft
            ),
            rate: format!("{}/sq ft/month", plot.price_per_sqft_monthly.display()),
            status: plot.status,
        }
    }
}

/// A row in "my equipment".
#[derive(Clone)]
pub struct EquipmentRowView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub status: Availability,
}

impl From<&EquipmentListing> for EquipmentRowView {
    fn from(item: &EquipmentListing) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            category: item.category.clone(),
            price: format!("{}/day", item.price_per_day.display()),
            status: item.availability_status,
        }
    }
}

/// A headline number.
#[derive(Clone)]
pub struct StatView {
    pub label: &'static str,
    pub value: String,
}

fn stat(label: &'static str, value: impl ToString) -> StatView {
    StatView {
        label,
        value: value.to_string(),
    }
}

fn views<'a, T: 'a, V: From<&'a T>>(rows: &'a [T]) -> Vec<V> {
    rows.iter().map(V::from).collect()
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "dashboard/user.html")]
pub struct UserDashboardTemplate {
    pub page: Page,
    pub stats: Vec<StatView>,
    pub leases: Vec<LeaseView>,
    pub rentals: Vec<RentalView>,
    pub produce: Vec<ProduceRowView>,
    pub orders: Vec<OrderView>,
    pub can_sell: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard/farmer.html")]
pub struct FarmerDashboardTemplate {
    pub page: Page,
    pub stats: Vec<StatView>,
    pub plots: Vec<PlotRowView>,
    pub leases: Vec<LeaseView>,
    pub produce: Vec<ProduceRowView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard/vendor.html")]
pub struct VendorDashboardTemplate {
    pub page: Page,
    pub stats: Vec<StatView>,
    pub equipment: Vec<EquipmentRowView>,
    pub rentals: Vec<RentalView>,
}

fn require_role(user: &CurrentUser, role: AppRole) -> Result<()> {
    if user.role == role || user.role == AppRole::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "The {} dashboard is for {} accounts",
            role.as_str(),
            role.label()
        )))
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Send the user to their role's dashboard.
pub async fn index(RequireUser(user): RequireUser) -> Redirect {
    Redirect::to(user.role.dashboard_path())
}

/// Leases, rentals, produce and orders of the signed-in user.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn user(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    page: Page,
) -> Result<impl IntoResponse> {
    let activity = DashboardService::new(state.backend())
        .user_activity(&user)
        .await?;

    Ok(UserDashboardTemplate {
        stats: vec![
            stat("Active leases", activity.active_leases()),
            stat("Active rentals", activity.active_rentals()),
            stat("Produce listings", activity.produce.len()),
            stat("Orders", activity.orders.len()),
        ],
        leases: views(&activity.leases),
        rentals: views(&activity.rentals),
        produce: views(&activity.produce),
        orders: views(&activity.orders),
        can_sell: user.role.can_create(farmshare_core::ListingKind::Produce),
        page,
    })
}

/// A landowner's plots, leases and revenue.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn farmer(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    page: Page,
) -> Result<impl IntoResponse> {
    require_role(&user, AppRole::Farmer)?;
    let overview = DashboardService::new(state.backend())
        .farmer_overview(&user)
        .await?;

    let active = overview
        .leases
        .iter()
        .filter(|l| l.status == LeaseStatus::Active)
        .count();
    Ok(FarmerDashboardTemplate {
        stats: vec![
            stat("Plots listed", overview.plots.len()),
            stat("Active leases", active),
            stat("Monthly revenue", overview.monthly_revenue().display()),
        ],
        plots: views(&overview.plots),
        leases: views(&overview.leases),
        produce: views(&overview.produce),
        page,
    })
}

/// A vendor's equipment, rentals and revenue.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn vendor(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    page: Page,
) -> Result<impl IntoResponse> {
    require_role(&user, AppRole::Vendor)?;
    let overview = DashboardService::new(state.backend())
        .vendor_overview(&user)
        .await?;

    Ok(VendorDashboardTemplate {
        stats: vec![
            stat("Equipment listed", overview.equipment.len()),
            stat("Active rentals", overview.active_rentals()),
            stat("Rental revenue", overview.rental_revenue().display()),
        ],
        equipment: views(&overview.equipment),
        rentals: views(&overview.rentals),
        page,
    })
}
