//! Session-store migration.
//!
//! Marketplace tables belong to the managed backend and are not migrated
//! from here. The only local schema is the session table.
//!
//! # Environment Variables
//!
//! - `FARMSHARE_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)

use secrecy::SecretString;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use farmshare_web::db;

/// Create the `tower_sessions.session` table if it does not exist.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable, or
/// the migration fails.
pub async fn sessions() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("FARMSHARE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "FARMSHARE_DATABASE_URL not set")?;

    info!("Connecting to session database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    info!("Session store ready");
    Ok(())
}
