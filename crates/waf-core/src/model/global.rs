//! Global configuration layer (spec §3, §4.2).

use serde::{Deserialize, Serialize};

/// Score/rate thresholds, surfaced to clients as `X-WAF-*-Threshold`
/// headers (spec §6.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    pub spam_threshold: Option<f64>,
    pub hash_rate_threshold: Option<f64>,
    pub ip_spam_threshold: Option<f64>,
    pub fingerprint_threshold: Option<f64>,
}

impl ThresholdsConfig {
    /// Object-typed recursive child-wins merge, per-key (spec §4.2).
    pub fn merge(parent: &Self, child: &Self) -> Self {
        Self {
            spam_threshold: super::merge_scalar(&parent.spam_threshold, &child.spam_threshold),
            hash_rate_threshold: super::merge_scalar(
                &parent.hash_rate_threshold,
                &child.hash_rate_threshold,
            ),
            ip_spam_threshold: super::merge_scalar(
                &parent.ip_spam_threshold,
                &child.ip_spam_threshold,
            ),
            fingerprint_threshold: super::merge_scalar(
                &parent.fingerprint_threshold,
                &child.fingerprint_threshold,
            ),
        }
    }
}

/// Timing budgets (spec §3 "timing").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingConfig {
    pub max_execution_time_ms: Option<u64>,
    pub min_interaction_seconds: Option<f64>,
}

impl TimingConfig {
    pub fn merge(parent: &Self, child: &Self) -> Self {
        Self {
            max_execution_time_ms: super::merge_scalar(
                &parent.max_execution_time_ms,
                &child.max_execution_time_ms,
            ),
            min_interaction_seconds: super::merge_scalar(
                &parent.min_interaction_seconds,
                &child.min_interaction_seconds,
            ),
        }
    }
}

/// Routing defaults (spec §3 "routing").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub rate_limit_value: Option<u64>,
    pub default_action_on_provider_error: Option<String>,
}

impl RoutingConfig {
    pub fn merge(parent: &Self, child: &Self) -> Self {
        Self {
            rate_limit_value: super::merge_scalar(
                &parent.rate_limit_value,
                &child.rate_limit_value,
            ),
            default_action_on_provider_error: super::merge_scalar(
                &parent.default_action_on_provider_error,
                &child.default_action_on_provider_error,
            ),
        }
    }
}

/// Opaque GeoIP configuration (vendor-specific; out of scope per §1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoIpConfig(pub serde_json::Value);

/// Opaque reputation-provider configuration (out of scope per §1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReputationConfig(pub serde_json::Value);

/// Opaque webhook delivery configuration (out of scope per §1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhooksConfig(pub serde_json::Value);

/// The global defaults layer (spec §4.2, layer 1 of 3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub thresholds: ThresholdsConfig,
    pub routing: RoutingConfig,
    pub timing: TimingConfig,
    pub geoip: GeoIpConfig,
    pub reputation: ReputationConfig,
    pub webhooks: WebhooksConfig,
    pub mode: super::Mode,
}
