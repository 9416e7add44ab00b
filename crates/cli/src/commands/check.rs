//! Backend reachability check.

use std::time::Duration;

use tracing::{error, info};

use farmshare_web::config::SupabaseConfig;
use farmshare_web::supabase::{
    EQUIPMENT_LISTINGS, LAND_LISTINGS, PRODUCE_LISTINGS, PROFILES, SupabaseClient,
};

const TABLES: [&str; 4] = [PROFILES, LAND_LISTINGS, EQUIPMENT_LISTINGS, PRODUCE_LISTINGS];

/// Count the rows of each public table with the anon key.
///
/// # Errors
///
/// Returns an error if the backend settings are missing or any table can't
/// be counted.
pub async fn backend() -> Result<(), Box<dyn std::error::Error>> {
    let config = SupabaseConfig::from_env()?;
    info!(url = %config.url, "Checking backend");

    let client = SupabaseClient::new(&config, Duration::from_secs(1));
    let mut failures = 0;
    for table in TABLES {
        match client.count(table).await {
            Ok(count) => info!("  {table}: {count} rows"),
            Err(e) => {
                failures += 1;
                error!("  {table}: {e}");
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} of {} tables unreachable", TABLES.len()).into());
    }
    info!("Backend OK");
    Ok(())
}
