//! Force a one-shot snapshot read from the store (spec §4.7).
//!
//! The running gateway's Sync Worker owns the actual in-process cache swap;
//! this command can't reach into another process's memory, so it performs
//! the same read the Sync Worker would and reports what it found — useful
//! for confirming the store is in the shape an instance's next scheduled
//! sync will pick up.

use anyhow::{Context, Result};
use clap::Args;
use waf_core::store::ConfigStoreClient;

#[derive(Args)]
pub struct SyncNowArgs {
    #[arg(long, env = "WAF_STORE_URL")]
    store_url: String,
}

pub async fn run(args: SyncNowArgs) -> Result<()> {
    let client = waf_store::RedisStoreClient::new(&args.store_url)
        .await
        .context("connecting to store")?;

    let snapshot = client.read_snapshot().await.context("reading snapshot")?;

    println!("vhosts: {}", snapshot.vhosts.len());
    println!("global endpoints: {}", snapshot.global_endpoints.len());
    println!("vhost-scoped endpoints: {}", snapshot.vhost_endpoints.len());
    println!("defense profiles: {}", snapshot.defense_profiles.len());
    println!("attack signatures: {}", snapshot.attack_signatures.len());
    println!("fingerprint profiles: {}", snapshot.fingerprint_profiles.len());
    println!("blocked keywords: {}", snapshot.blocked_keywords.len());
    println!("flagged keywords: {}", snapshot.flagged_keywords.len());
    println!("blocked hashes: {}", snapshot.blocked_hashes.len());
    println!("whitelisted IPs: {}", snapshot.whitelist_ips.len());
    Ok(())
}
