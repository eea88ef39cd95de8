//! Metrics Aggregator: per-instance counter accumulation and periodic push
//! (spec §4.9).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::warn;
use waf_core::model::{EndpointMetricsKey, MetricsCounters};
use waf_core::store::ConfigStoreClient;

pub const PUSH_PERIOD: Duration = Duration::from_secs(30);

/// Process-local accumulator the request path writes into; the push loop
/// drains it on each tick.
#[derive(Default)]
pub struct MetricsCollector {
    counters: DashMap<EndpointMetricsKey, MetricsCounters>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: EndpointMetricsKey, delta: MetricsCounters) {
        self.counters.entry(key).or_default().merge(&delta);
    }

    fn drain(&self) -> HashMap<String, MetricsCounters> {
        self.counters
            .iter()
            .map(|entry| (entry.key().field_name(), *entry.value()))
            .collect()
    }
}

pub async fn run_push<S: ConfigStoreClient>(store: Arc<S>, instance_id: String, collector: Arc<MetricsCollector>) {
    let mut ticker = tokio::time::interval(PUSH_PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let snapshot = collector.drain();
        if snapshot.is_empty() {
            continue;
        }
        if let Err(e) = store.push_instance_metrics(&instance_id, &snapshot).await {
            warn!(instance_id = %instance_id, error = %e, "failed to push instance metrics");
        }
    }
}

/// Leader-only fan-in step, invoked from the maintenance round.
pub async fn aggregate_once<S: ConfigStoreClient>(store: Arc<S>) {
    if let Err(e) = store.aggregate_global_metrics().await {
        warn!(error = %e, "failed to aggregate global metrics");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_across_calls() {
        let collector = MetricsCollector::new();
        let key = EndpointMetricsKey {
            vhost_id: "default".into(),
            endpoint_id: "ep-1".into(),
        };
        collector.record(
            key.clone(),
            MetricsCounters {
                total_requests: 1,
                ..Default::default()
            },
        );
        collector.record(
            key.clone(),
            MetricsCounters {
                total_requests: 2,
                ..Default::default()
            },
        );
        let snapshot = collector.drain();
        assert_eq!(snapshot[&key.field_name()].total_requests, 3);
    }
}
