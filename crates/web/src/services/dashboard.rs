//! Per-role dashboard reads.
//!
//! Every query runs with the user's own token, so row-level policies
//! decide what comes back; the filters here only narrow it to "mine".

use farmshare_core::{LeaseStatus, Money, RentalStatus};
use tracing::instrument;

use crate::models::CurrentUser;
use crate::supabase::{
    AccessToken, BackendError, EQUIPMENT_LISTINGS, EQUIPMENT_RENTALS, EquipmentListing,
    EquipmentRental, LAND_LISTINGS, LandListing, ORDERS, Order, PLOT_LEASES, PRODUCE_LISTINGS,
    PlotLease, ProduceListing, Query, SupabaseClient,
};

/// What a hobbyist has leased, rented, listed and ordered.
#[derive(Debug, Default)]
pub struct UserActivity {
    pub leases: Vec<PlotLease>,
    pub rentals: Vec<EquipmentRental>,
    pub produce: Vec<ProduceListing>,
    pub orders: Vec<Order>,
}

impl UserActivity {
    #[must_use]
    pub fn active_leases(&self) -> usize {
        self.leases
            .iter()
            .filter(|l| l.status == LeaseStatus::Active)
            .count()
    }

    #[must_use]
    pub fn active_rentals(&self) -> usize {
        self.rentals
            .iter()
            .filter(|r| r.status == RentalStatus::Active)
            .count()
    }
}

/// A landowner's plots, the leases on them and their produce.
#[derive(Debug, Default)]
pub struct FarmerOverview {
    pub plots: Vec<LandListing>,
    pub leases: Vec<PlotLease>,
    pub produce: Vec<ProduceListing>,
}

impl FarmerOverview {
    /// Rent due each month from active leases.
    #[must_use]
    pub fn monthly_revenue(&self) -> Money {
        self.leases
            .iter()
            .filter(|l| l.status == LeaseStatus::Active)
            .map(|l| l.monthly_price)
            .sum()
    }
}

/// A vendor's equipment and its rentals.
#[derive(Debug, Default)]
pub struct VendorOverview {
    pub equipment: Vec<EquipmentListing>,
    pub rentals: Vec<EquipmentRental>,
}

impl VendorOverview {
    /// Earned from every rental that wasn't cancelled.
    #[must_use]
    pub fn rental_revenue(&self) -> Money {
        self.rentals
            .iter()
            .filter(|r| r.status != RentalStatus::Cancelled)
            .map(|r| r.total_price)
            .sum()
    }

    #[must_use]
    pub fn active_rentals(&self) -> usize {
        self.rentals
            .iter()
            .filter(|r| r.status == RentalStatus::Active)
            .count()
    }
}

/// Dashboard queries.
pub struct DashboardService<'a> {
    backend: &'a SupabaseClient,
}

impl<'a> DashboardService<'a> {
    #[must_use]
    pub const fn new(backend: &'a SupabaseClient) -> Self {
        Self { backend }
    }

    /// # Errors
    ///
    /// Returns the first backend error.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn user_activity(&self, user: &CurrentUser) -> Result<UserActivity, BackendError> {
        let token = AccessToken::User(&user.access_token);
        let leases = Query::table(PLOT_LEASES)
            .select("*,land_listings(title,location)")
            .eq("user_id", user.id)
            .order_desc("created_at");
        let rentals = Query::table(EQUIPMENT_RENTALS)
            .select("*,equipment_listings(name,category)")
            .eq("user_id", user.id)
            .order_desc("created_at");
        let produce = Query::table(PRODUCE_LISTINGS)
            .eq("farmer_id", user.id)
            .order_desc("created_at");
        let orders = Query::table(ORDERS)
            .select("*,produce_listings(name,unit)")
            .eq("buyer_id", user.id)
            .order_desc("created_at");

        let (leases, rentals, produce, orders) = tokio::try_join!(
            self.backend.select(&leases, token),
            self.backend.select(&rentals, token),
            self.backend.select(&produce, token),
            self.backend.select(&orders, token),
        )?;
        Ok(UserActivity {
            leases,
            rentals,
            produce,
            orders,
        })
    }

    /// # Errors
    ///
    /// Returns the first backend error.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn farmer_overview(&self, user: &CurrentUser) -> Result<FarmerOverview, BackendError> {
        let token = AccessToken::User(&user.access_token);
        let plots = Query::table(LAND_LISTINGS)
            .eq("farmer_id", user.id)
            .order_desc("created_at");
        let leases = Query::table(PLOT_LEASES)
            .select("*,land_listings!inner(title,location,farmer_id)")
            .eq("land_listings.farmer_id", user.id)
            .order_desc("created_at");
        let produce = Query::table(PRODUCE_LISTINGS)
            .eq("farmer_id", user.id)
            .order_desc("created_at");

        let (plots, leases, produce) = tokio::try_join!(
            self.backend.select(&plots, token),
            self.backend.select(&leases, token),
            self.backend.select(&produce, token),
        )?;
        Ok(FarmerOverview {
            plots,
            leases,
            produce,
        })
    }

    /// # Errors
    ///
    /// Returns the first backend error.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn vendor_overview(&self, user: &CurrentUser) -> Result<VendorOverview, BackendError> {
        let token = AccessToken::User(&user.access_token);
        let equipment = Query::table(EQUIPMENT_LISTINGS)
            .eq("vendor_id", user.id)
            .order_desc("created_at");
        let rentals = Query::table(EQUIPMENT_RENTALS)
            .select("*,equipment_listings!inner(name,category,vendor_id)")
            .eq("equipment_listings.vendor_id", user.id)
            .order_desc("created_at");

        let (equipment, rentals) = tokio::try_join!(
            self.backend.select(&equipment, token),
            self.backend.select(&rentals, token),
        )?;
        Ok(VendorOverview { equipment, rentals })
    }
}
