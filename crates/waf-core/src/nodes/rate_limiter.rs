//! `rate_limiter` built-in node (spec §4.3).
//!
//! The spec delegates cross-instance counting to the stick-table layer
//! (§1); this handler is the single-instance fallback plus the decision
//! interface a graph node calls into. It also consults the cache's
//! `blocked_hashes` set (duplicate/blocklisted form-submission hashes),
//! which is the other half of "keyed by client IP / form hash" (§4.3).

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Deserialize;

use crate::cache::LocalCache;
use crate::graph::{HandlerOutput, NodeHandler};
use crate::request::RequestContext;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum KeyBy {
    ClientIp,
    FormHash,
}

impl Default for KeyBy {
    fn default() -> Self {
        KeyBy::ClientIp
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    requests_per_minute: f64,
    key_by: KeyBy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            requests_per_minute: 60.0,
            key_by: KeyBy::default(),
        }
    }
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A per-process token bucket per key, refilled continuously at
/// `requests_per_minute / 60` tokens/second.
pub struct RateLimiterHandler {
    cache: Arc<LocalCache>,
    buckets: DashMap<String, Mutex<Bucket>>,
}

impl RateLimiterHandler {
    pub fn new(cache: Arc<LocalCache>) -> Self {
        Self {
            cache,
            buckets: DashMap::new(),
        }
    }

    fn consume(&self, key: &str, capacity: f64) -> bool {
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
        bucket.last_refill = now;
        let refill_rate = capacity / 60.0;
        bucket.tokens = (bucket.tokens + elapsed * refill_rate).min(capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl NodeHandler for RateLimiterHandler {
    fn evaluate(&self, ctx: &RequestContext, config: &serde_json::Value) -> HandlerOutput {
        let config: Config = serde_json::from_value(config.clone()).unwrap_or_default();

        if self.cache.snapshot().blocked_hashes.contains(&ctx.form_hash) {
            return HandlerOutput {
                outcome_label: "blocked".to_string(),
                score_delta: 0.0,
                flags: vec!["blocked_hash".to_string()],
                details: serde_json::json!({ "form_hash": ctx.form_hash }),
            };
        }

        let key = match config.key_by {
            KeyBy::ClientIp => ctx.client_ip.clone(),
            KeyBy::FormHash => ctx.form_hash.clone(),
        };

        if self.consume(&key, config.requests_per_minute.max(1.0)) {
            HandlerOutput::new("continue")
        } else {
            HandlerOutput {
                outcome_label: "blocked".to_string(),
                score_delta: 0.0,
                flags: vec!["rate_limited".to_string()],
                details: serde_json::json!({ "key": key }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx(ip: &str) -> RequestContext {
        RequestContext {
            host: "example.com".into(),
            path: "/submit".into(),
            method: "POST".into(),
            client_ip: ip.into(),
            headers: HashMap::new(),
            form_fields: HashMap::new(),
            form_hash: "h".into(),
            submission_fingerprint: "fp".into(),
            vhost_id: "default".into(),
            endpoint_id: "ep".into(),
        }
    }

    #[test]
    fn exhausting_the_bucket_blocks() {
        let handler = RateLimiterHandler::new(Arc::new(LocalCache::new()));
        let config = serde_json::json!({ "requests_per_minute": 1 });
        assert_eq!(handler.evaluate(&ctx("1.2.3.4"), &config).outcome_label, "continue");
        assert_eq!(handler.evaluate(&ctx("1.2.3.4"), &config).outcome_label, "blocked");
    }

    #[test]
    fn distinct_keys_have_independent_buckets() {
        let handler = RateLimiterHandler::new(Arc::new(LocalCache::new()));
        let config = serde_json::json!({ "requests_per_minute": 1 });
        assert_eq!(handler.evaluate(&ctx("1.1.1.1"), &config).outcome_label, "continue");
        assert_eq!(handler.evaluate(&ctx("2.2.2.2"), &config).outcome_label, "continue");
    }
}
