//! Ties heartbeat, leader election/maintenance, metrics push, and field
//! learning into one set of independent background loops sharing a pooled
//! store handle (spec §9 "Coroutines and timers").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;
use waf_core::store::ConfigStoreClient;

use crate::field_learner::FieldLearner;
use crate::metrics::MetricsCollector;
use crate::{field_learner, heartbeat, instance_id, leader, metrics};

pub struct InstanceCoordinator<S: ConfigStoreClient + 'static> {
    store: Arc<S>,
    instance_id: String,
    is_leader: Arc<AtomicBool>,
    pub metrics: Arc<MetricsCollector>,
    pub field_learner: Arc<FieldLearner>,
}

impl<S: ConfigStoreClient + 'static> InstanceCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            instance_id: instance_id::resolve(),
            is_leader: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(MetricsCollector::new()),
            field_learner: Arc::new(FieldLearner::new(field_learner::DEFAULT_SAMPLE_ONE_IN)),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::Acquire)
    }

    /// Spawn every periodic loop. Returns their join handles so the caller
    /// (`waf-gateway`) can abort them on shutdown.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        info!(instance_id = %self.instance_id, "starting instance coordinator loops");

        let heartbeat_handle = tokio::spawn(heartbeat::run(self.store.clone(), self.instance_id.clone()));

        let election_handle = tokio::spawn(leader::run_election(
            self.store.clone(),
            self.instance_id.clone(),
            self.is_leader.clone(),
        ));

        let maintenance_handle = tokio::spawn(leader::run_maintenance(
            self.store.clone(),
            self.is_leader.clone(),
            |store| async move { metrics::aggregate_once(store).await },
        ));

        let metrics_push_handle = tokio::spawn(metrics::run_push(
            self.store.clone(),
            self.instance_id.clone(),
            self.metrics.clone(),
        ));

        let field_flush_handle = tokio::spawn(field_learner::run_flush(self.store.clone(), self.field_learner.clone()));

        vec![
            heartbeat_handle,
            election_handle,
            maintenance_handle,
            metrics_push_handle,
            field_flush_handle,
        ]
    }

    /// Deregister this instance and drop leadership if held (spec §9
    /// "tear down on shutdown with a deregistration call").
    pub async fn shutdown(&self) {
        info!(instance_id = %self.instance_id, "deregistering instance");
        if let Err(e) = self.store.remove_instance(&self.instance_id).await {
            tracing::warn!(instance_id = %self.instance_id, error = %e, "failed to deregister instance on shutdown");
        }
    }
}
