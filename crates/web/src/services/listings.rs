//! Listing reads and owner writes.
//!
//! Public pages read through the listing cache. Creating and editing go
//! out with the owner's token; the role and ownership checks here only
//! decide which form to offer, the backend's row policies have the final
//! say.

use tracing::instrument;

use farmshare_core::{
    AppRole, Availability, EquipmentId, LandListingId, LandStatus, ListingKind, ProduceId,
    ProduceStatus, ProfileId,
};

use crate::error::AppError;
use crate::models::CurrentUser;
use crate::supabase::{
    AccessToken, BackendError, EQUIPMENT_LISTINGS, EquipmentFields, EquipmentListing,
    LAND_LISTINGS, LandListing, LandListingFields, LandListingPatch, NewEquipmentListing,
    NewLandListing, NewProduceListing, PRODUCE_LISTINGS, ProduceFields, ProduceListing,
    ProducePatch, Query, SupabaseClient,
};

/// Columns for land reads, with the owner's name.
const LAND_COLUMNS: &str = "*,profiles:farmer_id(full_name)";
/// Columns for produce reads, with the seller's name.
const PRODUCE_COLUMNS: &str = "*,profiles:farmer_id(full_name)";

/// Why a listing write was refused.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("role {role} cannot create {kind:?} listings")]
    RoleNotAllowed { role: AppRole, kind: ListingKind },

    #[error("listing belongs to someone else")]
    NotOwner,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<ListingError> for AppError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::RoleNotAllowed { kind, .. } => Self::Forbidden(
                match kind {
                    ListingKind::Land => "Only landowners can list land",
                    ListingKind::Equipment => "Only vendors can list equipment",
                    ListingKind::Produce => "Only growers can list produce",
                }
                .to_string(),
            ),
            ListingError::NotOwner => Self::Forbidden("You can only edit your own listings".to_string()),
            ListingError::Backend(e) => Self::Backend(e),
        }
    }
}

/// Check `user` may create listings of `kind`.
///
/// # Errors
///
/// Returns [`ListingError::RoleNotAllowed`] when the role can't.
pub const fn ensure_can_create(user: &CurrentUser, kind: ListingKind) -> Result<(), ListingError> {
    if user.role.can_create(kind) {
        Ok(())
    } else {
        Err(ListingError::RoleNotAllowed {
            role: user.role,
            kind,
        })
    }
}

/// Check `user` owns a listing (admins own everything).
///
/// # Errors
///
/// Returns [`ListingError::NotOwner`] otherwise.
pub fn ensure_owner(user: &CurrentUser, owner: ProfileId) -> Result<(), ListingError> {
    if user.id == owner || user.role == AppRole::Admin {
        Ok(())
    } else {
        Err(ListingError::NotOwner)
    }
}

/// Listing operations against the backend.
pub struct ListingService<'a> {
    backend: &'a SupabaseClient,
}

impl<'a> ListingService<'a> {
    #[must_use]
    pub const fn new(backend: &'a SupabaseClient) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Public reads
    // =========================================================================

    /// Open plots, newest first.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn open_plots(&self) -> Result<Vec<LandListing>, BackendError> {
        let query = Query::table(LAND_LISTINGS)
            .select(LAND_COLUMNS)
            .eq("status", LandStatus::Active)
            .order_desc("created_at");
        self.backend.select_cached(&query).await
    }

    /// All equipment, newest first. Rented items stay visible but can't be
    /// booked.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn equipment(&self) -> Result<Vec<EquipmentListing>, BackendError> {
        let query = Query::table(EQUIPMENT_LISTINGS).order_desc("created_at");
        self.backend.select_cached(&query).await
    }

    /// All produce, newest first, with seller names.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn produce(&self) -> Result<Vec<ProduceListing>, BackendError> {
        let query = Query::table(PRODUCE_LISTINGS)
            .select(PRODUCE_COLUMNS)
            .order_desc("created_at");
        self.backend.select_cached(&query).await
    }

    /// One plot, read fresh.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for an unknown id.
    pub async fn plot(
        &self,
        id: LandListingId,
        token: AccessToken<'_>,
    ) -> Result<LandListing, BackendError> {
        let query = Query::table(LAND_LISTINGS).select(LAND_COLUMNS).eq("id", id);
        self.backend.select_one(&query, token).await
    }

    /// One equipment item, read fresh.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for an unknown id.
    pub async fn equipment_item(
        &self,
        id: EquipmentId,
        token: AccessToken<'_>,
    ) -> Result<EquipmentListing, BackendError> {
        let query = Query::table(EQUIPMENT_LISTINGS).eq("id", id);
        self.backend.select_one(&query, token).await
    }

    /// One produce listing, read fresh.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for an unknown id.
    pub async fn produce_item(
        &self,
        id: ProduceId,
        token: AccessToken<'_>,
    ) -> Result<ProduceListing, BackendError> {
        let query = Query::table(PRODUCE_LISTINGS)
            .select(PRODUCE_COLUMNS)
            .eq("id", id);
        self.backend.select_one(&query, token).await
    }

    // =========================================================================
    // Land
    // =========================================================================

    /// List a new plot; all of it starts out available.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::RoleNotAllowed`] for non-landowners, or the
    /// backend error.
    #[instrument(skip(self, user, fields), fields(user_id = %user.id))]
    pub async fn create_land(
        &self,
        user: &CurrentUser,
        fields: LandListingFields,
    ) -> Result<LandListing, ListingError> {
        ensure_can_create(user, ListingKind::Land)?;
        let row = NewLandListing {
            farmer_id: user.id,
            available_area_sqft: fields.total_area_sqft,
            status: LandStatus::Active,
            fields,
        };
        let plot: LandListing = self
            .backend
            .insert(LAND_LISTINGS, &row, AccessToken::User(&user.access_token))
            .await?;
        tracing::info!(plot_id = %plot.id, "Plot listed");
        Ok(plot)
    }

    /// Edit a plot. While it is open, its available area follows the new
    /// total; a leased plot keeps its zero.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::NotOwner`] unless `user` owns the plot, or
    /// the backend error.
    #[instrument(skip(self, user, fields), fields(user_id = %user.id))]
    pub async fn update_land(
        &self,
        user: &CurrentUser,
        id: LandListingId,
        fields: LandListingFields,
    ) -> Result<(), ListingError> {
        let token = AccessToken::User(&user.access_token);
        let current = self.plot(id, token).await?;
        ensure_owner(user, current.farmer_id)?;

        let patch = LandListingPatch {
            available_area_sqft: (current.status == LandStatus::Active)
                .then_some(fields.total_area_sqft),
            fields,
        };
        self.backend
            .update(&Query::table(LAND_LISTINGS).eq("id", id), &patch, token)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Equipment
    // =========================================================================

    /// List a new piece of equipment as available.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::RoleNotAllowed`] for non-vendors, or the
    /// backend error.
    #[instrument(skip(self, user, fields), fields(user_id = %user.id))]
    pub async fn create_equipment(
        &self,
        user: &CurrentUser,
        fields: EquipmentFields,
    ) -> Result<EquipmentListing, ListingError> {
        ensure_can_create(user, ListingKind::Equipment)?;
        let row = NewEquipmentListing {
            vendor_id: user.id,
            availability_status: Availability::Available,
            fields,
        };
        let item: EquipmentListing = self
            .backend
            .insert(EQUIPMENT_LISTINGS, &row, AccessToken::User(&user.access_token))
            .await?;
        tracing::info!(equipment_id = %item.id, "Equipment listed");
        Ok(item)
    }

    /// Edit a piece of equipment. Availability is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::NotOwner`] unless `user` owns it, or the
    /// backend error.
    #[instrument(skip(self, user, fields), fields(user_id = %user.id))]
    pub async fn update_equipment(
        &self,
        user: &CurrentUser,
        id: EquipmentId,
        fields: EquipmentFields,
    ) -> Result<(), ListingError> {
        let token = AccessToken::User(&user.access_token);
        let current = self.equipment_item(id, token).await?;
        ensure_owner(user, current.vendor_id)?;

        self.backend
            .update(&Query::table(EQUIPMENT_LISTINGS).eq("id", id), &fields, token)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Produce
    // =========================================================================

    /// List new produce.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::RoleNotAllowed`] for vendors, or the backend
    /// error.
    #[instrument(skip(self, user, fields), fields(user_id = %user.id))]
    pub async fn create_produce(
        &self,
        user: &CurrentUser,
        fields: ProduceFields,
    ) -> Result<ProduceListing, ListingError> {
        ensure_can_create(user, ListingKind::Produce)?;
        let row = NewProduceListing {
            farmer_id: user.id,
            status: stock_status(fields.quantity_available),
            fields,
        };
        let item: ProduceListing = self
            .backend
            .insert(PRODUCE_LISTINGS, &row, AccessToken::User(&user.access_token))
            .await?;
        tracing::info!(produce_id = %item.id, "Produce listed");
        Ok(item)
    }

    /// Edit produce; restocking a sold-out listing reopens it.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::NotOwner`] unless `user` owns it, or the
    /// backend error.
    #[instrument(skip(self, user, fields), fields(user_id = %user.id))]
    pub async fn update_produce(
        &self,
        user: &CurrentUser,
        id: ProduceId,
        fields: ProduceFields,
    ) -> Result<(), ListingError> {
        let token = AccessToken::User(&user.access_token);
        let current = self.produce_item(id, token).await?;
        ensure_owner(user, current.farmer_id)?;

        let patch = ProducePatch {
            status: stock_status(fields.quantity_available),
            fields,
        };
        self.backend
            .update(&Query::table(PRODUCE_LISTINGS).eq("id", id), &patch, token)
            .await?;
        Ok(())
    }
}

fn stock_status(quantity: u32) -> ProduceStatus {
    ProduceStatus::after_sale(quantity, 0).status
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use farmshare_core::Email;

    use super::*;

    fn user(role: AppRole) -> CurrentUser {
        CurrentUser {
            id: ProfileId::random(),
            email: Email::parse("grower@example.com").unwrap(),
            full_name: "Anita Rao".to_string(),
            role,
            access_token: "jwt".to_string(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_gating() {
        assert!(ensure_can_create(&user(AppRole::Farmer), ListingKind::Land).is_ok());
        assert!(ensure_can_create(&user(AppRole::Vendor), ListingKind::Land).is_err());
        assert!(ensure_can_create(&user(AppRole::User), ListingKind::Produce).is_ok());
        assert!(ensure_can_create(&user(AppRole::Vendor), ListingKind::Produce).is_err());
        assert!(ensure_can_create(&user(AppRole::Admin), ListingKind::Equipment).is_ok());
    }

    #[test]
    fn test_ownership() {
        let owner = user(AppRole::Farmer);
        assert!(ensure_owner(&owner, owner.id).is_ok());
        assert!(ensure_owner(&user(AppRole::Farmer), owner.id).is_err());
        assert!(ensure_owner(&user(AppRole::Admin), owner.id).is_ok());
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(stock_status(0), ProduceStatus::SoldOut);
        assert_eq!(stock_status(4), ProduceStatus::Active);
    }

    #[test]
    fn test_listing_error_maps_to_forbidden() {
        let err: AppError = ListingError::RoleNotAllowed {
            role: AppRole::Vendor,
            kind: ListingKind::Land,
        }
        .into();
        assert_eq!(err.to_string(), "Forbidden: Only landowners can list land");
    }
}
