//! `/metrics` and `/healthz`, served on their own axum router (spec §6.2).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::Error;

/// Reports whether the Local Cache has completed at least one successful
/// sync (spec §6.2 "reports `warmup=true` before first sync").
pub trait WarmupProbe: Send + Sync + 'static {
    fn is_warm(&self) -> bool;
}

impl<F: Fn() -> bool + Send + Sync + 'static> WarmupProbe for F {
    fn is_warm(&self) -> bool {
        self()
    }
}

#[derive(Clone)]
struct ObservabilityState {
    registry: Arc<Registry>,
    warmup: Arc<dyn WarmupProbe>,
}

#[derive(Serialize)]
struct HealthBody {
    warmup: bool,
}

pub fn router(registry: Arc<Registry>, warmup: Arc<dyn WarmupProbe>) -> Router {
    let state = ObservabilityState { registry, warmup };
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, registry: Arc<Registry>, warmup: Arc<dyn WarmupProbe>) -> Result<(), Error> {
    let app = router(registry, warmup);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
    info!(%addr, "observability server listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })
}

async fn metrics_handler(State(state): State<ObservabilityState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = state.registry.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        error!(error = %e, "failed to encode prometheus metrics");
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics".to_string());
    }
    match String::from_utf8(buffer) {
        Ok(body) => (axum::http::StatusCode::OK, body),
        Err(_) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "non-utf8 metrics buffer".to_string()),
    }
}

async fn healthz_handler(State(state): State<ObservabilityState>) -> impl IntoResponse {
    let warmup = state.warmup.is_warm();
    Json(HealthBody { warmup: !warmup }).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthz_reports_warmup_before_first_sync() {
        let registry = Arc::new(Registry::new());
        let warm = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let warm_clone = warm.clone();
        let probe: Arc<dyn WarmupProbe> = Arc::new(move || warm_clone.load(std::sync::atomic::Ordering::Acquire));

        let app = router(registry, probe);
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
