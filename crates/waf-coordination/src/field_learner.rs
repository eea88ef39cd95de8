//! Field Learner (spec's expanded §4.9 component): sampled capture of
//! observed form field names per endpoint, flushed additively to the store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tracing::warn;
use waf_core::store::ConfigStoreClient;

pub const FLUSH_PERIOD: Duration = Duration::from_secs(30);
/// Default sample rate: capture roughly 1 in 20 requests per endpoint.
pub const DEFAULT_SAMPLE_ONE_IN: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EndpointRef {
    vhost_id: String,
    endpoint_id: String,
}

#[derive(Default)]
pub struct FieldLearner {
    sample_one_in: u32,
    observed: DashMap<EndpointRef, HashSet<String>>,
}

impl FieldLearner {
    pub fn new(sample_one_in: u32) -> Self {
        Self {
            sample_one_in: sample_one_in.max(1),
            observed: DashMap::new(),
        }
    }

    /// Call once per request; internally decides whether this request is
    /// sampled. Cheap no-op on the common unsampled path.
    pub fn maybe_observe(&self, vhost_id: &str, endpoint_id: &str, field_names: impl Iterator<Item = String>) {
        if !rand::thread_rng().gen_ratio(1, self.sample_one_in) {
            return;
        }
        let key = EndpointRef {
            vhost_id: vhost_id.to_string(),
            endpoint_id: endpoint_id.to_string(),
        };
        self.observed.entry(key).or_default().extend(field_names);
    }

    fn drain(&self) -> Vec<(EndpointRef, Vec<String>)> {
        self.observed
            .iter_mut()
            .map(|mut entry| {
                let fields: Vec<String> = entry.value_mut().drain().collect();
                (entry.key().clone(), fields)
            })
            .collect()
    }
}

pub async fn run_flush<S: ConfigStoreClient>(store: Arc<S>, learner: Arc<FieldLearner>) {
    let mut ticker = tokio::time::interval(FLUSH_PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        for (endpoint, fields) in learner.drain() {
            if fields.is_empty() {
                continue;
            }
            if let Err(e) = store.learn_fields(&endpoint.vhost_id, &endpoint.endpoint_id, &fields).await {
                warn!(
                    vhost_id = %endpoint.vhost_id,
                    endpoint_id = %endpoint.endpoint_id,
                    error = %e,
                    "failed to flush learned fields"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_observes_at_sample_rate_one() {
        let learner = FieldLearner::new(1);
        learner.maybe_observe("default", "ep-1", vec!["email".to_string()].into_iter());
        let drained = learner.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].1, vec!["email".to_string()]);
    }
}
