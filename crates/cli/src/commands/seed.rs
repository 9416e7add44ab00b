//! Seed the backend with demo listings.
//!
//! Reads land, equipment and produce from a YAML file and inserts them
//! with the service-role key, so row-level policies don't block writing on
//! behalf of the owner named in the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use farmshare_core::{Availability, LandStatus, ProduceStatus, ProfileId};
use farmshare_web::config::SupabaseConfig;
use farmshare_web::supabase::{
    AccessToken, EQUIPMENT_LISTINGS, EquipmentFields, LAND_LISTINGS, LandListingFields,
    NewEquipmentListing, NewLandListing, NewProduceListing, PRODUCE_LISTINGS, ProduceFields,
    SupabaseClient,
};

/// Demo file shipped with the CLI.
pub const DEFAULT_FILE: &str = "crates/cli/data/demo.yaml";

/// Contents of a demo file.
#[derive(Debug, Deserialize)]
pub struct DemoData {
    /// Profile that owns every listing.
    pub owner_id: ProfileId,
    #[serde(default)]
    pub land: Vec<LandListingFields>,
    #[serde(default)]
    pub equipment: Vec<EquipmentFields>,
    #[serde(default)]
    pub produce: Vec<ProduceFields>,
}

impl DemoData {
    /// Number of listings in the file.
    pub fn total(&self) -> usize {
        self.land.len() + self.equipment.len() + self.produce.len()
    }

    /// Problems that would make the backend reject a row, or make it
    /// unusable on the site.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for plot in &self.land {
            if plot.title.trim().is_empty() {
                errors.push("land: a plot has no title".to_string());
            }
            if plot.total_area_sqft == 0 {
                errors.push(format!("land '{}': total_area_sqft must be above zero", plot.title));
            }
            if plot.price_per_sqft_monthly.is_zero() {
                errors.push(format!("land '{}': price must be above zero", plot.title));
            }
        }
        for item in &self.equipment {
            if item.name.trim().is_empty() {
                errors.push("equipment: an item has no name".to_string());
            }
            if item.price_per_day.is_zero() {
                errors.push(format!("equipment '{}': price must be above zero", item.name));
            }
        }
        for item in &self.produce {
            if item.name.trim().is_empty() {
                errors.push("produce: an item has no name".to_string());
            }
            if item.price_per_unit.is_zero() {
                errors.push(format!("produce '{}': price must be above zero", item.name));
            }
        }
        errors
    }
}

/// Outcome of a seeding run.
#[derive(Debug, Default)]
pub struct SeedResult {
    pub inserted: usize,
    pub errors: Vec<(String, String)>,
}

/// Insert the listings in `file_path`.
///
/// # Errors
///
/// Returns an error if the file can't be read or fails validation, or the
/// backend settings (including `SUPABASE_SERVICE_ROLE_KEY`) are missing.
/// Failed rows are reported and skipped.
pub async fn demo(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading demo listings from file");
    let content = tokio::fs::read_to_string(path).await?;
    let data: DemoData = serde_yaml::from_str(&content)?;
    info!(
        land = data.land.len(),
        equipment = data.equipment.len(),
        produce = data.produce.len(),
        "Parsed demo file"
    );

    let errors = data.validate();
    if !errors.is_empty() {
        error!("Demo file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    if dry_run {
        info!("Dry run: {} listings would be inserted", data.total());
        return Ok(());
    }

    let config = SupabaseConfig::from_env()?;
    if config.service_role_key.is_none() {
        return Err("SUPABASE_SERVICE_ROLE_KEY not set".into());
    }
    let client = SupabaseClient::new(&config, Duration::from_secs(1));

    let result = insert_all(&client, data).await;

    info!("Seeding complete!");
    info!("  Listings inserted: {}", result.inserted);
    if !result.errors.is_empty() {
        error!("  Errors: {}", result.errors.len());
        for (name, err) in &result.errors {
            error!("    - {name}: {err}");
        }
    }
    Ok(())
}

async fn insert_all(client: &SupabaseClient, data: DemoData) -> SeedResult {
    let mut result = SeedResult::default();
    let owner = data.owner_id;

    for fields in data.land {
        let name = fields.title.clone();
        let row = NewLandListing {
            farmer_id: owner,
            available_area_sqft: fields.total_area_sqft,
            status: LandStatus::Active,
            fields,
        };
        record(&mut result, name, insert(client, LAND_LISTINGS, &row).await);
    }

    for fields in data.equipment {
        let name = fields.name.clone();
        let row = NewEquipmentListing {
            vendor_id: owner,
            availability_status: Availability::Available,
            fields,
        };
        record(&mut result, name, insert(client, EQUIPMENT_LISTINGS, &row).await);
    }

    for fields in data.produce {
        let name = fields.name.clone();
        let row = NewProduceListing {
            farmer_id: owner,
            status: ProduceStatus::after_sale(fields.quantity_available, 0).status,
            fields,
        };
        record(&mut result, name, insert(client, PRODUCE_LISTINGS, &row).await);
    }

    result
}

async fn insert<T: serde::Serialize + Sync>(
    client: &SupabaseClient,
    table: &'static str,
    row: &T,
) -> Result<(), String> {
    client
        .insert::<_, serde_json::Value>(table, row, AccessToken::ServiceRole)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn record(result: &mut SeedResult, name: String, outcome: Result<(), String>) {
    match outcome {
        Ok(()) => {
            info!("  + {name}");
            result.inserted += 1;
        }
        Err(e) => result.errors.push((name, e)),
    }
}
