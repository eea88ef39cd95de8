//! Shared state handed to every axum handler invocation (spec §5: the
//! request path reads the Local Cache and the node registry, both built
//! once at startup and shared read-only behind `Arc`).

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use waf_core::cache::LocalCache;
use waf_core::form::FormParseLimits;
use waf_core::graph::NodeRegistry;
use waf_coordination::InstanceCoordinator;
use waf_observability::WafMetrics;
use waf_store::RedisStoreClient;

#[derive(Clone)]
pub struct GatewayState {
    pub cache: Arc<LocalCache>,
    pub registry: Arc<NodeRegistry>,
    pub coordinator: Arc<InstanceCoordinator<RedisStoreClient>>,
    pub metrics: Arc<WafMetrics>,
    pub form_limits: FormParseLimits,
    pub fingerprint_limiter: Arc<FingerprintLimiter>,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-fingerprint-profile token bucket (spec §3 "optional per-fingerprint
/// rate limit"), independent of the `rate_limiter` defense node's own
/// buckets since fingerprint profiles are evaluated before any graph runs.
#[derive(Default)]
pub struct FingerprintLimiter {
    buckets: DashMap<String, Mutex<Bucket>>,
}

impl FingerprintLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the request is within budget and should proceed.
    pub fn allow(&self, key: &str, requests_per_minute: u64) -> bool {
        let capacity = requests_per_minute as f64;
        if capacity <= 0.0 {
            return true;
        }
        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                Mutex::new(Bucket {
                    tokens: capacity,
                    last_refill: Instant::now(),
                })
            });
        let mut bucket = entry.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * (capacity / 60.0)).min(capacity);
        bucket.last_refill = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
