//! Sync Worker: the Local Cache's sole writer (spec §4.7).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::cache::{CacheSnapshot, LocalCache};
use crate::model::VirtualHost;
use crate::store::ConfigStoreClient;

/// Drives periodic and on-demand refreshes of a [`LocalCache`] from a
/// [`ConfigStoreClient`] (spec §4.7).
pub struct SyncWorker<S: ConfigStoreClient> {
    store: Arc<S>,
    cache: Arc<LocalCache>,
    version: AtomicU64,
    sync_now: Notify,
}

impl<S: ConfigStoreClient + 'static> SyncWorker<S> {
    pub fn new(store: Arc<S>, cache: Arc<LocalCache>) -> Self {
        Self {
            store,
            cache,
            version: AtomicU64::new(0),
            sync_now: Notify::new(),
        }
    }

    /// Trigger an immediate fetch outside the fixed interval (spec §4.7
    /// "an on-demand `sync_now` path triggers an immediate fetch after
    /// admin-surface writes").
    pub fn trigger(&self) {
        self.sync_now.notify_one();
    }

    /// Run the fixed-interval loop (default 30s) plus on-demand triggers,
    /// until the process shuts down.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.sync_now.notified() => {}
            }
            self.sync_once().await;
        }
    }

    /// Perform one snapshot read and, on success, atomically swap it into
    /// the live cache. On failure, logs and preserves the prior snapshot
    /// (spec §4.7 "On failure it logs and preserves the prior snapshot").
    pub async fn sync_once(&self) {
        match self.store.read_snapshot().await {
            Ok(snapshot) => {
                let next = build_cache_snapshot(snapshot, self.version.fetch_add(1, Ordering::SeqCst) + 1);
                self.cache.swap(next);
                tracing::info!(version = self.version.load(Ordering::SeqCst), "sync completed");
            }
            Err(err) => {
                tracing::warn!(error = %err, "sync failed, preserving prior cache snapshot");
            }
        }
    }
}

/// Re-index a flat [`crate::store::ConfigSnapshot`] read into the
/// lookup-friendly shape [`crate::cache::CacheSnapshot`] holds. Exposed so
/// offline tools (`waf-cli`'s simulate command) can build the same cache
/// shape the Sync Worker would, without duplicating the re-indexing.
pub fn build_cache_snapshot(snapshot: crate::store::ConfigSnapshot, version: u64) -> CacheSnapshot {
    let mut vhosts: HashMap<String, VirtualHost> = HashMap::new();
    for vhost in snapshot.vhosts {
        vhosts.insert(vhost.id.clone(), vhost);
    }

    let mut vhost_endpoints: HashMap<String, Vec<_>> = HashMap::new();
    for endpoint in snapshot.vhost_endpoints {
        if let Some(vhost_id) = &endpoint.vhost_id {
            vhost_endpoints.entry(vhost_id.clone()).or_default().push(endpoint);
        }
    }

    let defense_profiles = snapshot
        .defense_profiles
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();
    let attack_signatures = snapshot
        .attack_signatures
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

    CacheSnapshot {
        vhosts,
        global_endpoints: snapshot.global_endpoints,
        vhost_endpoints,
        defense_profiles,
        attack_signatures,
        fingerprint_profiles: snapshot.fingerprint_profiles,
        blocked_keywords: snapshot.blocked_keywords,
        flagged_keywords: snapshot.flagged_keywords.into_iter().collect(),
        blocked_hashes: snapshot.blocked_hashes.into_iter().collect(),
        whitelist_ips: snapshot.whitelist_ips.into_iter().collect(),
        global: snapshot.global,
        version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{InstanceRecord, MetricsCounters};
    use crate::store::ConfigSnapshot;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    struct FakeStore {
        fail: AtomicBool,
    }

    #[async_trait]
    impl ConfigStoreClient for FakeStore {
        async fn read_snapshot(&self) -> Result<ConfigSnapshot, Error> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::TransientStore("down".to_string()));
            }
            Ok(ConfigSnapshot::default())
        }
        async fn heartbeat(&self, _: &str, _: i64) -> Result<(), Error> {
            Ok(())
        }
        async fn try_acquire_leadership(&self, _: &str, _: u64) -> Result<bool, Error> {
            Ok(true)
        }
        async fn renew_leadership(&self, _: &str, _: u64) -> Result<bool, Error> {
            Ok(true)
        }
        async fn list_instances(&self) -> Result<Vec<InstanceRecord>, Error> {
            Ok(vec![])
        }
        async fn remove_instance(&self, _: &str) -> Result<(), Error> {
            Ok(())
        }
        async fn push_instance_metrics(
            &self,
            _: &str,
            _: &HashMap<String, MetricsCounters>,
        ) -> Result<(), Error> {
            Ok(())
        }
        async fn aggregate_global_metrics(&self) -> Result<(), Error> {
            Ok(())
        }
        async fn learn_fields(&self, _: &str, _: &str, _: &[String]) -> Result<(), Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn successful_sync_warms_the_cache() {
        let store = Arc::new(FakeStore {
            fail: AtomicBool::new(false),
        });
        let cache = Arc::new(LocalCache::new());
        let worker = SyncWorker::new(store, cache.clone());
        assert!(!cache.is_warm());
        worker.sync_once().await;
        assert!(cache.is_warm());
    }

    #[tokio::test]
    async fn failed_sync_preserves_prior_snapshot() {
        let store = Arc::new(FakeStore {
            fail: AtomicBool::new(false),
        });
        let cache = Arc::new(LocalCache::new());
        let worker = SyncWorker::new(store, cache.clone());
        worker.sync_once().await;
        let version_after_first = cache.snapshot().version;

        worker.store.fail.store(true, Ordering::SeqCst);
        worker.sync_once().await;
        assert_eq!(cache.snapshot().version, version_after_first);
    }
}
