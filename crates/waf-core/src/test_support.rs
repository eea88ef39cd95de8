//! In-memory `ConfigStoreClient` fake plus entity builders, gated behind
//! the `test-support` feature so both this crate's own tests and
//! downstream crates' integration tests can build fixtures without
//! hand-rolling JSON against a real store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Error;
use crate::model::{
    AggregationPolicy, DefenseProfile, Endpoint, GlobalConfig, InstanceRecord, MatchClause, MethodSet,
    MetricsCounters, Mode, ProfileSettings, Timestamps, VirtualHost, DEFAULT_VHOST_ID,
};
use crate::request::ActionKind;
use crate::store::{ConfigSnapshot, ConfigStoreClient};

/// An in-process store backing, good enough to exercise the Sync Worker,
/// Instance Coordinator, and Metrics Aggregator without a Redis instance.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    snapshot: ConfigSnapshot,
    instances: HashMap<String, InstanceRecord>,
    leader: Option<String>,
    learned_fields: HashMap<(String, String), std::collections::HashSet<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, snapshot: ConfigSnapshot) {
        self.state.lock().unwrap().snapshot = snapshot;
    }

    /// Force the current leader without going through `SET NX`, so tests
    /// can seed an already-held leadership and observe renewal loss.
    pub fn force_leader(&self, instance_id: Option<String>) {
        self.state.lock().unwrap().leader = instance_id;
    }

    pub fn learned_fields(&self, vhost_id: &str, endpoint_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .learned_fields
            .get(&(vhost_id.to_string(), endpoint_id.to_string()))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConfigStoreClient for InMemoryStore {
    async fn read_snapshot(&self) -> Result<ConfigSnapshot, Error> {
        Ok(self.state.lock().unwrap().snapshot.clone())
    }

    async fn heartbeat(&self, instance_id: &str, now_unix_ms: i64) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .instances
            .entry(instance_id.to_string())
            .or_insert_with(|| InstanceRecord {
                instance_id: instance_id.to_string(),
                last_heartbeat_unix_ms: now_unix_ms,
                is_leader: false,
            });
        record.last_heartbeat_unix_ms = now_unix_ms;
        Ok(())
    }

    async fn try_acquire_leadership(&self, instance_id: &str, _ttl_ms: u64) -> Result<bool, Error> {
        let mut state = self.state.lock().unwrap();
        if state.leader.is_none() {
            state.leader = Some(instance_id.to_string());
            Ok(true)
        } else {
            Ok(state.leader.as_deref() == Some(instance_id))
        }
    }

    async fn renew_leadership(&self, instance_id: &str, _ttl_ms: u64) -> Result<bool, Error> {
        let state = self.state.lock().unwrap();
        Ok(state.leader.as_deref() == Some(instance_id))
    }

    async fn list_instances(&self) -> Result<Vec<InstanceRecord>, Error> {
        Ok(self.state.lock().unwrap().instances.values().cloned().collect())
    }

    async fn remove_instance(&self, instance_id: &str) -> Result<(), Error> {
        self.state.lock().unwrap().instances.remove(instance_id);
        Ok(())
    }

    async fn push_instance_metrics(
        &self,
        _instance_id: &str,
        _counters: &HashMap<String, MetricsCounters>,
    ) -> Result<(), Error> {
        Ok(())
    }

    async fn aggregate_global_metrics(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn learn_fields(&self, vhost_id: &str, endpoint_id: &str, fields: &[String]) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .learned_fields
            .entry((vhost_id.to_string(), endpoint_id.to_string()))
            .or_default();
        entry.extend(fields.iter().cloned());
        Ok(())
    }
}

/// Builder for a minimal, always-present default vhost.
pub fn default_vhost() -> VirtualHost {
    VirtualHost {
        id: DEFAULT_VHOST_ID.to_string(),
        hostnames: vec!["_".to_string()],
        priority: 0,
        enabled: true,
        default_thresholds: None,
        default_timing: None,
        default_mode: Some(Mode::Blocking),
        default_routing: None,
        default_defense_profiles: None,
        metadata: Timestamps::now(),
    }
}

/// A minimal enabled endpoint matching an exact path on any method.
pub fn endpoint(id: &str, exact_path: &str) -> Endpoint {
    Endpoint {
        id: id.to_string(),
        vhost_id: None,
        matcher: MatchClause {
            exact_paths: vec![exact_path.to_string()],
            path_prefix: None,
            regex: None,
            methods: MethodSet::Any,
        },
        priority: 0,
        enabled: true,
        thresholds: None,
        mode: None,
        routing: None,
        timing: None,
        defense_profiles: vec![],
        aggregation: AggregationPolicy::default(),
        defense_lines: vec![],
        metadata: Timestamps::now(),
    }
}

/// A defense profile whose graph is a single `action` node — useful as a
/// minimal fixture when a test only cares about orchestration, not graph
/// traversal.
pub fn trivial_profile(id: &str, action: ActionKind) -> DefenseProfile {
    use crate::graph::{Graph, Node, NodeSpec};
    use std::collections::HashMap as Map;

    let mut nodes = Map::new();
    nodes.insert(
        "start".to_string(),
        Node {
            id: "start".to_string(),
            spec: NodeSpec::Action {
                action,
                reason: None,
                delay_seconds: None,
                provider: None,
            },
            outputs: Map::new(),
        },
    );

    DefenseProfile {
        id: id.to_string(),
        name: id.to_string(),
        enabled: true,
        priority: 0,
        builtin: false,
        settings: ProfileSettings::default(),
        graph: Graph {
            start: "start".to_string(),
            nodes,
        },
        version: 1,
        metadata: Timestamps::now(),
    }
}

pub fn global_config() -> GlobalConfig {
    GlobalConfig::default()
}
