//! Local Cache: the Sync Worker's sole write target, read by every request
//! (spec §4.7, §5 "Shared-resource policy").
//!
//! Copy-on-swap: readers take a cheap `Arc` clone of the current snapshot
//! and never block the writer; the writer builds a new snapshot off to the
//! side and swaps it in atomically. This is the same pattern the teacher
//! framework uses for its checkpoint state — a lock held only long enough
//! to clone or replace a pointer, never across actual work.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::{AttackSignature, DefenseProfile, Endpoint, FingerprintProfile, GlobalConfig, VirtualHost};

/// Everything the data-plane path reads per request, assembled by one sync
/// cycle (spec §6.1's key schema, flattened into typed collections).
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    pub vhosts: HashMap<String, VirtualHost>,
    /// Global-scope endpoints (no `vhost_id`).
    pub global_endpoints: Vec<Endpoint>,
    /// Endpoints scoped to a vhost, indexed by `vhost_id`.
    pub vhost_endpoints: HashMap<String, Vec<Endpoint>>,
    pub defense_profiles: HashMap<String, DefenseProfile>,
    pub attack_signatures: HashMap<String, AttackSignature>,
    pub fingerprint_profiles: Vec<FingerprintProfile>,
    pub blocked_keywords: Vec<String>,
    /// Flagged keyword → score, per the `:<score>` suffix convention
    /// (spec §6.1 `keywords:flagged`).
    pub flagged_keywords: HashMap<String, f64>,
    pub blocked_hashes: std::collections::HashSet<String>,
    pub whitelist_ips: std::collections::HashSet<String>,
    pub global: GlobalConfig,
    /// Monotonically increasing on every successful swap; used as part of
    /// memoization keys that must invalidate across a resync (e.g. compiled
    /// pattern caches keyed partly on cache generation).
    pub version: u64,
}

/// Copy-on-swap store for the current [`CacheSnapshot`] (spec §5: "readers
/// obtain a stable snapshot ... the Sync Worker is the sole writer; swaps
/// are atomic. Readers never block writers").
pub struct LocalCache {
    inner: RwLock<Arc<CacheSnapshot>>,
}

impl LocalCache {
    /// Starts empty; requests arriving before the first successful sync
    /// execute against this (spec §4.7: "requests execute against an empty
    /// cache and the resolver falls back to built-in defaults").
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::new(CacheSnapshot::default())),
        }
    }

    /// Obtain a stable, cheaply-cloned reference to the current snapshot.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.inner.read().clone()
    }

    /// Atomically replace the live snapshot. `next.version` should be one
    /// greater than the previous snapshot's.
    pub fn swap(&self, next: CacheSnapshot) {
        *self.inner.write() = Arc::new(next);
    }

    pub fn is_warm(&self) -> bool {
        self.snapshot().version > 0
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_cold() {
        let cache = LocalCache::new();
        assert!(!cache.is_warm());
    }

    #[test]
    fn swap_replaces_snapshot_and_is_visible_to_new_readers() {
        let cache = LocalCache::new();
        cache.swap(CacheSnapshot {
            version: 1,
            ..Default::default()
        });
        assert!(cache.is_warm());
        assert_eq!(cache.snapshot().version, 1);
    }
}
