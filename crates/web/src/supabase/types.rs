//! Row types for the backend tables.
//!
//! Read types mirror the table columns (plus any embedded resources a page
//! selects). Write types carry only the columns the site sets; ids and
//! timestamps are filled in by the database.

use chrono::{DateTime, NaiveDate, Utc};
use farmshare_core::{
    AppRole, Availability, EquipmentId, EquipmentRentalId, Filterable, LandListingId, LandStatus,
    LeaseStatus, Money, OrderId, OrderStatus, PlotLeaseId, ProduceId, ProduceStatus, ProfileId,
    RentalStatus,
};
use serde::{Deserialize, Serialize};

pub const PROFILES: &str = "profiles";
pub const USER_ROLES: &str = "user_roles";
pub const LAND_LISTINGS: &str = "land_listings";
pub const PLOT_LEASES: &str = "plot_leases";
pub const EQUIPMENT_LISTINGS: &str = "equipment_listings";
pub const EQUIPMENT_RENTALS: &str = "equipment_rentals";
pub const PRODUCE_LISTINGS: &str = "produce_listings";
pub const ORDERS: &str = "orders";

/// Amenity satisfied by the dedicated `water_access` column.
pub const WATER_ACCESS: &str = "Water Access";
pub const TOOL_SHED: &str = "Tool Shed";
pub const FENCED: &str = "Fenced";
pub const TRAINING: &str = "Offers Training";

// =============================================================================
// Profiles & roles
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProfile<'a> {
    pub id: ProfileId,
    pub email: &'a str,
    pub full_name: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleRow {
    pub user_id: ProfileId,
    pub role: AppRole,
}

/// Embedded `profiles(full_name)`.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerName {
    pub full_name: String,
}

// =============================================================================
// Land
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LandListing {
    pub id: LandListingId,
    pub farmer_id: ProfileId,
    pub title: String,
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub soil_type: Option<String>,
    pub total_area_sqft: u32,
    pub available_area_sqft: u32,
    pub price_per_sqft_monthly: Money,
    #[serde(default)]
    pub water_access: Option<bool>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
    pub status: LandStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "profiles")]
    pub owner: Option<OwnerName>,
}

impl LandListing {
    /// Amenity labels, including water access.
    #[must_use]
    pub fn amenity_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if self.water_access == Some(true) {
            labels.push(WATER_ACCESS.to_string());
        }
        labels.extend(
            self.amenities
                .iter()
                .flatten()
                .filter(|a| !a.eq_ignore_ascii_case(WATER_ACCESS))
                .cloned(),
        );
        labels
    }
}

impl Filterable for LandListing {
    fn searchable(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.location.as_str()];
        fields.extend(self.description.as_deref());
        fields
    }

    fn price(&self) -> Money {
        self.price_per_sqft_monthly
    }

    fn location(&self) -> Option<&str> {
        Some(&self.location)
    }

    fn size_sqft(&self) -> Option<u32> {
        Some(self.available_area_sqft)
    }

    fn has_amenity(&self, amenity: &str) -> bool {
        if amenity.eq_ignore_ascii_case(WATER_ACCESS) && self.water_access == Some(true) {
            return true;
        }
        self.amenities
            .iter()
            .flatten()
            .any(|a| a.eq_ignore_ascii_case(amenity))
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

/// Editable land columns, shared by create, edit and demo seeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandListingFields {
    pub title: String,
    pub location: String,
    pub total_area_sqft: u32,
    pub price_per_sqft_monthly: Money,
    pub soil_type: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub water_access: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewLandListing {
    pub farmer_id: ProfileId,
    pub available_area_sqft: u32,
    pub status: LandStatus,
    #[serde(flatten)]
    pub fields: LandListingFields,
}

/// Edit of an existing plot. Area resets only while the plot is open.
#[derive(Debug, Clone, Serialize)]
pub struct LandListingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_area_sqft: Option<u32>,
    #[serde(flatten)]
    pub fields: LandListingFields,
}

/// Marks a plot as taken.
#[derive(Debug, Clone, Serialize)]
pub struct LandStatusPatch {
    pub available_area_sqft: u32,
    pub status: LandStatus,
}

// =============================================================================
// Equipment
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentListing {
    pub id: EquipmentId,
    pub vendor_id: ProfileId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub price_per_day: Money,
    pub availability_status: Availability,
    pub created_at: DateTime<Utc>,
}

impl Filterable for EquipmentListing {
    fn searchable(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.category.as_str()]
    }

    fn price(&self) -> Money {
        self.price_per_day
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentFields {
    pub name: String,
    pub category: String,
    pub price_per_day: Money,
    pub location: Option<String>,
    pub condition: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEquipmentListing {
    pub vendor_id: ProfileId,
    pub availability_status: Availability,
    #[serde(flatten)]
    pub fields: EquipmentFields,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityPatch {
    pub availability_status: Availability,
}

// =============================================================================
// Produce
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ProduceListing {
    pub id: ProduceId,
    pub farmer_id: ProfileId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit: String,
    pub price_per_unit: Money,
    pub quantity_available: u32,
    #[serde(default)]
    pub organic: Option<bool>,
    #[serde(default)]
    pub harvest_date: Option<NaiveDate>,
    pub status: ProduceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "profiles")]
    pub seller: Option<OwnerName>,
}

impl ProduceListing {
    /// Whether the item can go in a cart.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.status == ProduceStatus::Active && self.quantity_available > 0
    }

    #[must_use]
    pub fn seller_name(&self) -> &str {
        self.seller.as_ref().map_or("FarmShare grower", |s| s.full_name.as_str())
    }
}

impl Filterable for ProduceListing {
    fn searchable(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.category.as_str()]
    }

    fn price(&self) -> Money {
        self.price_per_unit
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceFields {
    pub name: String,
    pub category: String,
    pub price_per_unit: Money,
    pub unit: String,
    pub quantity_available: u32,
    #[serde(default)]
    pub organic: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProduceListing {
    pub farmer_id: ProfileId,
    pub status: ProduceStatus,
    #[serde(flatten)]
    pub fields: ProduceFields,
}

/// Edit of a produce listing; status follows the new quantity.
#[derive(Debug, Clone, Serialize)]
pub struct ProducePatch {
    pub status: ProduceStatus,
    #[serde(flatten)]
    pub fields: ProduceFields,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockPatch {
    pub quantity_available: u32,
    pub status: ProduceStatus,
}

// =============================================================================
// Agreements & orders
// =============================================================================

/// Embedded `land_listings(title,location,farmer_id)`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlotSummary {
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlotLease {
    pub id: PlotLeaseId,
    pub land_listing_id: LandListingId,
    pub user_id: ProfileId,
    pub area_sqft: u32,
    pub monthly_price: Money,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaseStatus,
    #[serde(default, rename = "land_listings")]
    pub plot: Option<PlotSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPlotLease {
    pub land_listing_id: LandListingId,
    pub user_id: ProfileId,
    pub area_sqft: u32,
    pub monthly_price: Money,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaseStatus,
}

/// Embedded `equipment_listings(name,category)`.
#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentSummary {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentRental {
    pub id: EquipmentRentalId,
    pub equipment_id: EquipmentId,
    pub user_id: ProfileId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Money,
    pub status: RentalStatus,
    #[serde(default, rename = "equipment_listings")]
    pub equipment: Option<EquipmentSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEquipmentRental {
    pub equipment_id: EquipmentId,
    pub user_id: ProfileId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Money,
    pub status: RentalStatus,
}

/// Embedded `produce_listings(name,unit)`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProduceSummary {
    pub name: String,
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub produce_id: ProduceId,
    pub buyer_id: ProfileId,
    pub quantity: u32,
    pub total_price: Money,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "produce_listings")]
    pub produce: Option<ProduceSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewOrder<'a> {
    pub produce_id: ProduceId,
    pub buyer_id: ProfileId,
    pub quantity: u32,
    pub total_price: Money,
    pub delivery_address: &'a str,
    pub status: OrderStatus,
}
