//! Cluster and leadership status (spec §4.8).

use anyhow::{Context, Result};
use clap::Args;
use waf_core::store::ConfigStoreClient;

#[derive(Args)]
pub struct ClusterArgs {
    /// Store connection string, e.g. redis://localhost:6379
    #[arg(long, env = "WAF_STORE_URL")]
    store_url: String,
}

pub async fn run(args: ClusterArgs) -> Result<()> {
    let client = waf_store::RedisStoreClient::new(&args.store_url)
        .await
        .context("connecting to store")?;

    let instances = client.list_instances().await.context("listing instances")?;
    if instances.is_empty() {
        println!("no instances registered");
        return Ok(());
    }

    let now = chrono::Utc::now().timestamp_millis();
    println!("{:<24} {:>10} {:>10} {:<8}", "instance", "age_ms", "leader", "status");
    for instance in instances {
        let age_ms = now.saturating_sub(instance.last_heartbeat_unix_ms);
        let status = instance.status(now, 60_000, 300_000);
        println!(
            "{:<24} {:>10} {:>10} {:<8?}",
            instance.instance_id,
            age_ms,
            instance.is_leader,
            status
        );
    }
    Ok(())
}
