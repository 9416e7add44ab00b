//! Marketplace roles and what each role may list.

use serde::{Deserialize, Serialize};

/// Role assigned to a profile in the `user_roles` table.
///
/// The role decides which dashboard a user lands on and which kinds of
/// listing they may create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    /// Hobbyist farmer: leases plots, rents equipment, sells small harvests.
    #[default]
    User,
    /// Landowner: lists land plots and produce.
    Farmer,
    /// Equipment vendor: lists equipment for rent.
    Vendor,
    /// Platform administrator.
    Admin,
}

/// The three kinds of listing on the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    Land,
    Equipment,
    Produce,
}

impl AppRole {
    /// Roles a visitor may pick on the registration form.
    pub const SELF_SERVICE: [Self; 3] = [Self::User, Self::Farmer, Self::Vendor];

    /// Path of the dashboard for this role.
    #[must_use]
    pub const fn dashboard_path(self) -> &'static str {
        match self {
            Self::User | Self::Admin => "/dashboard/user",
            Self::Farmer => "/dashboard/farmer",
            Self::Vendor => "/dashboard/vendor",
        }
    }

    /// Whether this role may create a listing of the given kind.
    #[must_use]
    pub const fn can_create(self, kind: ListingKind) -> bool {
        matches!(
            (self, kind),
            (Self::Admin, _)
                | (Self::Farmer, ListingKind::Land | ListingKind::Produce)
                | (Self::Vendor, ListingKind::Equipment)
                | (Self::User, ListingKind::Produce)
        )
    }

    /// Human-readable label used on forms and dashboards.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "Hobbyist Farmer",
            Self::Farmer => "Landowner",
            Self::Vendor => "Equipment Vendor",
            Self::Admin => "Administrator",
        }
    }

    /// Stable string form, as stored by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Farmer => "farmer",
            Self::Vendor => "vendor",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for AppRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Self::User),
            "farmer" => Ok(Self::Farmer),
            "vendor" => Ok(Self::Vendor),
            "admin" => Ok(Self::Admin),
            other => Err(format!("invalid role: {other}")),
        }
    }
}

impl ListingKind {
    /// Backend table holding listings of this kind.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Land => "land_listings",
            Self::Equipment => "equipment_listings",
            Self::Produce => "produce_listings",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_paths() {
        assert_eq!(AppRole::User.dashboard_path(), "/dashboard/user");
        assert_eq!(AppRole::Farmer.dashboard_path(), "/dashboard/farmer");
        assert_eq!(AppRole::Vendor.dashboard_path(), "/dashboard/vendor");
    }

    #[test]
    fn test_listing_permissions() {
        assert!(AppRole::Farmer.can_create(ListingKind::Land));
        assert!(AppRole::Farmer.can_create(ListingKind::Produce));
        assert!(!AppRole::Farmer.can_create(ListingKind::Equipment));

        assert!(AppRole::Vendor.can_create(ListingKind::Equipment));
        assert!(!AppRole::Vendor.can_create(ListingKind::Land));

        assert!(AppRole::User.can_create(ListingKind::Produce));
        assert!(!AppRole::User.can_create(ListingKind::Land));

        for kind in [ListingKind::Land, ListingKind::Equipment, ListingKind::Produce] {
            assert!(AppRole::Admin.can_create(kind));
        }
    }

    #[test]
    fn test_round_trips_through_str() {
        for role in [AppRole::User, AppRole::Farmer, AppRole::Vendor, AppRole::Admin] {
            assert_eq!(role.to_string().parse::<AppRole>().unwrap(), role);
        }
        assert!("landlord".parse::<AppRole>().is_err());
    }
}
