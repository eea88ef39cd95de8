//! Internal Prometheus metrics (distinct from the spec's own cross-instance
//! `metrics:global` aggregation, which lives in `waf-coordination` and is
//! pushed through the store — this is purely for this process's own
//! operational visibility).

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

use crate::error::Error;

pub struct WafMetrics {
    pub requests_total: IntCounterVec,
    pub execution_duration_seconds: Histogram,
    pub graph_fallbacks_total: IntCounterVec,
    pub cache_version: IntGauge,
    pub is_leader: IntGauge,
    pub sync_failures_total: IntCounterVec,
}

impl WafMetrics {
    pub fn new(registry: &Registry) -> Result<Self, Error> {
        let requests_total = IntCounterVec::new(
            Opts::new("waf_requests_total", "Requests processed, by vhost/endpoint/action"),
            &["vhost_id", "endpoint_id", "action"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let execution_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "waf_execution_duration_seconds",
            "DAG executor wall time per profile evaluation",
        ))?;
        registry.register(Box::new(execution_duration_seconds.clone()))?;

        let graph_fallbacks_total = IntCounterVec::new(
            Opts::new(
                "waf_graph_fallbacks_total",
                "Defense profile executions that fell back to default_action, by reason",
            ),
            &["profile_id", "reason"],
        )?;
        registry.register(Box::new(graph_fallbacks_total.clone()))?;

        let cache_version = IntGauge::new("waf_cache_version", "Local cache snapshot version")?;
        registry.register(Box::new(cache_version.clone()))?;

        let is_leader = IntGauge::new("waf_is_leader", "1 if this instance currently holds cluster leadership")?;
        registry.register(Box::new(is_leader.clone()))?;

        let sync_failures_total = IntCounterVec::new(
            Opts::new("waf_sync_failures_total", "Sync Worker snapshot reads that failed"),
            &["reason"],
        )?;
        registry.register(Box::new(sync_failures_total.clone()))?;

        Ok(Self {
            requests_total,
            execution_duration_seconds,
            graph_fallbacks_total,
            cache_version,
            is_leader,
            sync_failures_total,
        })
    }
}
