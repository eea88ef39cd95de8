//! Dry-run a request against a live store snapshot without forwarding it
//! anywhere (spec §4.1–§4.6 end to end).

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use waf_core::cache::LocalCache;
use waf_core::graph::NodeRegistry;
use waf_core::store::ConfigStoreClient;
use waf_core::{hashing, matcher, nodes, orchestrator, request::RequestContext, resolver, sync};

#[derive(Args)]
pub struct SimulateArgs {
    #[arg(long, env = "WAF_STORE_URL")]
    store_url: String,

    #[arg(long)]
    host: String,

    #[arg(long)]
    path: String,

    #[arg(long, default_value = "POST")]
    method: String,

    #[arg(long)]
    client_ip: Option<String>,

    /// Repeatable `name=value` header. May be given more than once.
    #[arg(long = "header", value_name = "NAME=VALUE")]
    headers: Vec<String>,

    /// Repeatable `name=value` form field. May be given more than once.
    #[arg(long = "field", value_name = "NAME=VALUE")]
    fields: Vec<String>,
}

fn parse_kv_list(raw: &[String]) -> HashMap<String, String> {
    raw.iter()
        .filter_map(|entry| entry.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub async fn run(args: SimulateArgs) -> Result<()> {
    let client = waf_store::RedisStoreClient::new(&args.store_url)
        .await
        .context("connecting to store")?;
    let snapshot = client.read_snapshot().await.context("reading snapshot")?;
    let cache_snapshot = sync::build_cache_snapshot(snapshot, 1);

    let local_cache = Arc::new(LocalCache::new());
    local_cache.swap(cache_snapshot);
    let cache = local_cache.snapshot();

    let mut registry = NodeRegistry::new();
    nodes::register_builtins(&mut registry, local_cache.clone());

    let headers = parse_kv_list(&args.headers);
    let form_fields = parse_kv_list(&args.fields);
    let form_hash = hashing::form_hash(&form_fields);

    let match_result = matcher::resolve(&cache, &args.host, &args.path, &args.method);
    let endpoint = cache
        .vhost_endpoints
        .get(&match_result.vhost_id)
        .into_iter()
        .flatten()
        .chain(cache.global_endpoints.iter())
        .find(|e| e.id == match_result.endpoint_id)
        .cloned()
        .unwrap_or_else(waf_core::model::Endpoint::synthetic_default);

    let effective = resolver::resolve(&cache, &match_result, &endpoint);

    let ctx = RequestContext {
        host: args.host.clone(),
        path: args.path.clone(),
        method: args.method.clone(),
        client_ip: args.client_ip.clone().unwrap_or_else(|| "127.0.0.1".to_string()),
        headers,
        form_fields,
        form_hash,
        submission_fingerprint: String::new(),
        vhost_id: match_result.vhost_id.clone(),
        endpoint_id: match_result.endpoint_id.clone(),
    };

    println!(
        "matched vhost={} ({:?}), endpoint={} ({:?})",
        match_result.vhost_id, match_result.vhost_match_type, match_result.endpoint_id, match_result.endpoint_match_type
    );
    println!("mode={:?} skip_waf={}", effective.mode, effective.skip_waf);

    if effective.skip_waf {
        println!("decision: allow ({})", effective.skip_reason.unwrap_or_default());
        return Ok(());
    }

    let decision = orchestrator::orchestrate(
        &cache,
        &registry,
        &ctx,
        &effective.defense_profiles,
        &endpoint.aggregation,
        &endpoint.defense_lines,
    )
    .await;

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
