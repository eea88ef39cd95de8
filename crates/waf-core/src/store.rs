//! `ConfigStoreClient`: the storage-agnostic contract the Sync Worker,
//! Instance Coordinator, and Metrics Aggregator are built against (spec
//! §6.1). `waf-store` provides the Redis-backed implementation; this crate
//! only depends on the trait, keeping `waf-core` free of any store SDK.

use async_trait::async_trait;

use crate::error::Error;
use crate::model::{AttackSignature, DefenseProfile, Endpoint, FingerprintProfile, VirtualHost};

/// A full snapshot read of one category, as the Sync Worker pulls it (spec
/// §4.7 "a full snapshot read of each category from the store").
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    pub vhosts: Vec<VirtualHost>,
    pub global_endpoints: Vec<Endpoint>,
    pub vhost_endpoints: Vec<Endpoint>,
    pub defense_profiles: Vec<DefenseProfile>,
    pub attack_signatures: Vec<AttackSignature>,
    pub fingerprint_profiles: Vec<FingerprintProfile>,
    pub blocked_keywords: Vec<String>,
    pub flagged_keywords: Vec<(String, f64)>,
    pub blocked_hashes: Vec<String>,
    pub whitelist_ips: Vec<String>,
    pub global: crate::model::GlobalConfig,
}

/// The store-facing operations the core's background workers need (spec
/// §4.7, §4.8, §4.9, §6.1). Implementations must surface
/// [`Error::TransientStore`] on failure rather than panicking — callers
/// fall back to the last good cache snapshot.
#[async_trait]
pub trait ConfigStoreClient: Send + Sync {
    /// Read every category in one pass (spec §4.7).
    async fn read_snapshot(&self) -> Result<ConfigSnapshot, Error>;

    /// Write this instance's heartbeat with a 90s TTL and update its
    /// instance record (spec §4.8).
    async fn heartbeat(&self, instance_id: &str, now_unix_ms: i64) -> Result<(), Error>;

    /// Attempt to acquire `cluster:leader` via `SET NX PX` (spec §4.8).
    /// Returns whether this instance now holds leadership.
    async fn try_acquire_leadership(&self, instance_id: &str, ttl_ms: u64) -> Result<bool, Error>;

    /// Renew leadership; callers treat a renewal failure as leadership
    /// loss (spec §7 "TransientStoreError ... coordinator treats a failed
    /// leadership renewal as leadership loss").
    async fn renew_leadership(&self, instance_id: &str, ttl_ms: u64) -> Result<bool, Error>;

    /// List every instance record the cluster currently knows about (spec
    /// §4.8 leader maintenance scan).
    async fn list_instances(&self) -> Result<Vec<crate::model::InstanceRecord>, Error>;

    async fn remove_instance(&self, instance_id: &str) -> Result<(), Error>;

    /// Push this instance's counters into `metrics:instance:<id>` (spec
    /// §4.9 push path).
    async fn push_instance_metrics(
        &self,
        instance_id: &str,
        counters: &std::collections::HashMap<String, crate::model::MetricsCounters>,
    ) -> Result<(), Error>;

    /// Fan in every `metrics:instance:*` hash into `metrics:global` (spec
    /// §4.9 leader fan-in); leader-only.
    async fn aggregate_global_metrics(&self) -> Result<(), Error>;

    /// Merge observed field names into `waf:fields:<vhost_id>:<endpoint_id>`
    /// (spec's Field Learner expansion: additive `SADD`, never overwrite).
    async fn learn_fields(&self, vhost_id: &str, endpoint_id: &str, fields: &[String]) -> Result<(), Error>;
}
