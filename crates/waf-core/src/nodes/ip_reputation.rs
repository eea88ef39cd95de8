//! `ip_reputation` built-in node (spec §4.3).

use std::sync::Arc;

use serde::Deserialize;

use crate::cache::LocalCache;
use crate::error::Error;
use crate::graph::{HandlerOutput, NodeHandler};
use crate::request::RequestContext;

/// What an external reputation lookup concluded about a client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReputationVerdict {
    Good,
    Suspicious,
    Bad,
}

/// External reputation lookup, pluggable so `waf-gateway` can wire in a
/// real provider without this crate depending on any specific vendor SDK
/// (spec §4.3 "a pluggable `ReputationProvider` trait for external
/// lookups"). Synchronous because `NodeHandler::evaluate` is synchronous
/// over an already-cached view of the world; a provider backed by a
/// remote call should maintain its own background-refreshed cache rather
/// than blocking the request on I/O here (spec §5's suspension-point list
/// doesn't include node evaluation).
pub trait ReputationProvider: Send + Sync {
    fn check(&self, client_ip: &str) -> Result<ReputationVerdict, Error>;
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "snake_case")]
struct Config {
    /// What to do when the provider call fails: `"allow"`, `"flag"`, or
    /// `"block"` (spec §7 "ProviderError ... applies the configured
    /// fallback").
    default_action_on_provider_error: String,
    bad_score: f64,
    suspicious_score: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_action_on_provider_error: "allow".to_string(),
            bad_score: 10.0,
            suspicious_score: 3.0,
        }
    }
}

/// Whitelist-first, then a pluggable provider; built-in fallback is
/// "allow" when no provider is configured at all (spec §4.3).
pub struct IpReputationHandler {
    cache: Arc<LocalCache>,
    provider: Option<Arc<dyn ReputationProvider>>,
}

impl IpReputationHandler {
    pub fn new(cache: Arc<LocalCache>, provider: Option<Arc<dyn ReputationProvider>>) -> Self {
        Self { cache, provider }
    }
}

impl NodeHandler for IpReputationHandler {
    fn evaluate(&self, ctx: &RequestContext, config: &serde_json::Value) -> HandlerOutput {
        let config: Config = serde_json::from_value(config.clone()).unwrap_or_default();

        if self.cache.snapshot().whitelist_ips.contains(&ctx.client_ip) {
            return HandlerOutput::new("continue");
        }

        let Some(provider) = &self.provider else {
            return HandlerOutput::new("continue");
        };

        match provider.check(&ctx.client_ip) {
            Ok(ReputationVerdict::Good) => HandlerOutput::new("continue"),
            Ok(ReputationVerdict::Suspicious) => HandlerOutput {
                outcome_label: "flagged".to_string(),
                score_delta: config.suspicious_score,
                flags: vec!["suspicious_ip".to_string()],
                details: serde_json::Value::Null,
            },
            Ok(ReputationVerdict::Bad) => HandlerOutput {
                outcome_label: "blocked".to_string(),
                score_delta: config.bad_score,
                flags: vec!["bad_ip_reputation".to_string()],
                details: serde_json::Value::Null,
            },
            Err(err) => provider_error_outcome(&config.default_action_on_provider_error, &err),
        }
    }
}

fn provider_error_outcome(fallback: &str, err: &Error) -> HandlerOutput {
    let flag = format!("provider_error:{err}");
    match fallback {
        "block" => HandlerOutput {
            outcome_label: "blocked".to_string(),
            score_delta: 0.0,
            flags: vec![flag],
            details: serde_json::Value::Null,
        },
        "flag" => HandlerOutput {
            outcome_label: "flagged".to_string(),
            score_delta: 0.0,
            flags: vec![flag],
            details: serde_json::Value::Null,
        },
        _ => HandlerOutput {
            outcome_label: "continue".to_string(),
            score_delta: 0.0,
            flags: vec![flag],
            details: serde_json::Value::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSnapshot;
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

    struct AlwaysBad;
    impl ReputationProvider for AlwaysBad {
        fn check(&self, _client_ip: &str) -> Result<ReputationVerdict, Error> {
            Ok(ReputationVerdict::Bad)
        }
    }

    struct AlwaysErrors;
    impl ReputationProvider for AlwaysErrors {
        fn check(&self, _client_ip: &str) -> Result<ReputationVerdict, Error> {
            Err(Error::Provider {
                provider: "test".to_string(),
                reason: "timeout".to_string(),
            })
        }
    }

    #[test]
    fn whitelisted_ip_short_circuits_before_provider() {
        let cache = Arc::new(LocalCache::new());
        let mut snapshot = CacheSnapshot::default();
        snapshot.whitelist_ips.insert("9.9.9.9".to_string());
        cache.swap(snapshot);

        let handler = IpReputationHandler::new(cache, Some(Arc::new(AlwaysBad)));
        let output = handler.evaluate(&ctx("9.9.9.9"), &serde_json::Value::Null);
        assert_eq!(output.outcome_label, "continue");
    }

    #[test]
    fn bad_verdict_blocks() {
        let handler = IpReputationHandler::new(Arc::new(LocalCache::new()), Some(Arc::new(AlwaysBad)));
        let output = handler.evaluate(&ctx("1.2.3.4"), &serde_json::Value::Null);
        assert_eq!(output.outcome_label, "blocked");
    }

    #[test]
    fn provider_error_falls_back_to_configured_action() {
        let handler = IpReputationHandler::new(Arc::new(LocalCache::new()), Some(Arc::new(AlwaysErrors)));
        let config = serde_json::json!({ "default_action_on_provider_error": "block" });
        let output = handler.evaluate(&ctx("1.2.3.4"), &config);
        assert_eq!(output.outcome_label, "blocked");
    }
}
