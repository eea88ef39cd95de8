//! Data-plane gateway binary (spec §6.2): wires the Sync Worker, Instance
//! Coordinator, node registry, and `POST /*path` handler into one axum
//! service, alongside the ambient `/healthz` + `/metrics` surface.

mod config;
mod error;
mod fingerprint;
mod handler;
mod reputation;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::post;
use axum::Router;
use prometheus::Registry;
use tokio::signal;
use tracing::{error, info};

use waf_core::cache::LocalCache;
use waf_core::graph::NodeRegistry;
use waf_core::nodes::{self, IpReputationHandler};
use waf_core::sync::SyncWorker;
use waf_coordination::InstanceCoordinator;
use waf_observability::WafMetrics;
use waf_store::RedisStoreClient;

use crate::config::Config;
use crate::reputation::HttpReputationProvider;
use crate::state::{FingerprintLimiter, GatewayState};

#[tokio::main]
async fn main() -> Result<()> {
    waf_observability::init_logging();

    let config = Config::from_env().context("loading gateway configuration")?;

    let store = Arc::new(
        RedisStoreClient::new(&config.store_url)
            .await
            .context("connecting to config store")?,
    );

    let cache = Arc::new(LocalCache::new());
    let sync_worker = Arc::new(SyncWorker::new(store.clone(), cache.clone()));
    sync_worker.sync_once().await;
    let sync_handle = tokio::spawn(sync_worker.clone().run(config.sync_interval));

    let mut registry = NodeRegistry::new();
    nodes::register_builtins(&mut registry, cache.clone());

    let mut reputation_handle = None;
    if let Some(feed_url) = config.reputation_feed_url.clone() {
        let provider = HttpReputationProvider::new(feed_url);
        reputation_handle = Some(provider.spawn(config.reputation_refresh_interval));
        let provider: Arc<dyn nodes::ReputationProvider> = provider;
        registry.register(
            nodes::kind::IP_REPUTATION,
            Arc::new(IpReputationHandler::new(cache.clone(), Some(provider))),
        );
    }
    let registry = Arc::new(registry);

    let coordinator = Arc::new(InstanceCoordinator::new(store.clone()));
    let coordination_handles = coordinator.spawn();

    let prometheus_registry = Arc::new(Registry::new());
    let metrics = Arc::new(WafMetrics::new(&prometheus_registry).context("registering prometheus metrics")?);

    let gateway_state = Arc::new(GatewayState {
        cache: cache.clone(),
        registry,
        coordinator: coordinator.clone(),
        metrics: metrics.clone(),
        form_limits: config.form_limits.clone(),
        fingerprint_limiter: Arc::new(FingerprintLimiter::new()),
    });

    let data_plane = Router::new()
        .fallback(post(handler::handle))
        .with_state(gateway_state);

    let warmup_cache = cache.clone();
    let warmup: Arc<dyn waf_observability::WarmupProbe> = Arc::new(move || warmup_cache.is_warm());
    let observability_router = waf_observability::router(prometheus_registry.clone(), warmup.clone());

    let app = data_plane.merge(observability_router).into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding data-plane listener on {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "waf-gateway listening");

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(e) = serve_result {
        error!(error = %e, "gateway server exited with error");
    }

    sync_handle.abort();
    if let Some(handle) = reputation_handle {
        handle.abort();
    }
    for handle in coordination_handles {
        handle.abort();
    }
    coordinator.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
