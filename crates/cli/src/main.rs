//! FarmShare CLI - session-store migration and backend tooling.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! fs-cli migrate
//!
//! # Insert demo listings into the backend
//! fs-cli seed --file crates/cli/data/demo.yaml
//!
//! # Check that the backend answers
//! fs-cli check
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create the `tower_sessions` schema and table
//! - `seed` - Insert demo land, equipment and produce (service-role key)
//! - `check` - Count rows in each marketplace table

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fs-cli")]
#[command(author, version, about = "FarmShare CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session-store table
    Migrate,
    /// Insert demo listings into the backend
    Seed {
        /// YAML file with the listings to insert
        #[arg(short, long, default_value = commands::seed::DEFAULT_FILE)]
        file: String,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Verify the backend is reachable
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Seed { file, dry_run } => commands::seed::demo(&file, dry_run).await?,
        Commands::Check => commands::check::backend().await?,
    }
    Ok(())
}
