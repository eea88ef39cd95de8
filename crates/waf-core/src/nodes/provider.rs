//! `ProviderBackedNode`: the uniform adapter for node kinds that aren't
//! built in (spec §4.3: "pattern-classifier ML, CAPTCHA verification,
//! GeoIP ... represented by the same contract via a `ProviderBackedNode`
//! adapter so the graph format is uniform; their concrete heuristics are
//! out of scope").

use serde::Deserialize;

use crate::error::Error;
use crate::graph::{HandlerOutput, NodeHandler};
use crate::request::RequestContext;

/// What a non-built-in node's external heuristic concluded. Unlike
/// [`super::ReputationVerdict`] this carries an arbitrary outcome label
/// so a single adapter covers ML classifiers, CAPTCHA challenges, and
/// GeoIP lookups alike.
pub struct ProviderOutcome {
    pub outcome_label: String,
    pub score_delta: f64,
    pub flags: Vec<String>,
    pub details: serde_json::Value,
}

pub trait ExternalProvider: Send + Sync {
    fn evaluate(&self, ctx: &RequestContext, config: &serde_json::Value) -> Result<ProviderOutcome, Error>;
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "snake_case")]
struct FallbackConfig {
    default_action_on_provider_error: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            default_action_on_provider_error: "allow".to_string(),
        }
    }
}

/// Wraps one [`ExternalProvider`] as a [`NodeHandler`], registered under
/// whatever name the defense profile's graph references (e.g.
/// `"geoip"`, `"captcha"`, `"pattern_classifier"`).
pub struct ProviderBackedNode {
    name: &'static str,
    provider: std::sync::Arc<dyn ExternalProvider>,
}

impl ProviderBackedNode {
    pub fn new(name: &'static str, provider: std::sync::Arc<dyn ExternalProvider>) -> Self {
        Self { name, provider }
    }
}

impl NodeHandler for ProviderBackedNode {
    fn evaluate(&self, ctx: &RequestContext, config: &serde_json::Value) -> HandlerOutput {
        match self.provider.evaluate(ctx, config) {
            Ok(outcome) => HandlerOutput {
                outcome_label: outcome.outcome_label,
                score_delta: outcome.score_delta,
                flags: outcome.flags,
                details: outcome.details,
            },
            Err(err) => {
                let fallback: FallbackConfig = serde_json::from_value(config.clone()).unwrap_or_default();
                let flag = format!("provider_error:{}:{err}", self.name);
                match fallback.default_action_on_provider_error.as_str() {
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
        }
    }
}
