//! Operator tool for the WAF: offline graph validation, cluster/leader
//! status, a forced sync read, and request simulation against a live cache
//! snapshot. Not the admin CRUD surface (spec §6.2, out of scope).

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{cluster, simulate, sync_now, validate_profile};

#[derive(Parser)]
#[command(name = "waf")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator tool for the multi-tenant form WAF")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a defense profile graph offline, without touching the store
    ValidateProfile(validate_profile::ValidateProfileArgs),

    /// Show cluster instance and leadership status
    Cluster(cluster::ClusterArgs),

    /// Force a one-shot snapshot read from the store and report what it would warm the cache with
    SyncNow(sync_now::SyncNowArgs),

    /// Dry-run a request against a live store snapshot without forwarding it anywhere
    Simulate(simulate::SimulateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    waf_observability::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::ValidateProfile(args) => validate_profile::run(args),
        Commands::Cluster(args) => cluster::run(args).await,
        Commands::SyncNow(args) => sync_now::run(args).await,
        Commands::Simulate(args) => simulate::run(args).await,
    }
}
