//! `honeypot_timing` built-in node (spec §4.3).

use serde::Deserialize;

use crate::graph::{HandlerOutput, NodeHandler};
use crate::request::RequestContext;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    /// Form field carrying the render-time timing token, a Unix
    /// millisecond timestamp stamped when the form was served.
    field: String,
    min_interaction_seconds: f64,
    /// Whether a missing/unparseable token itself blocks, or is treated
    /// as "no signal" and allowed to continue.
    required: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            field: "_waf_ts".to_string(),
            min_interaction_seconds: 2.0,
            required: false,
        }
    }
}

/// Enforces a minimum interaction-time floor between when a form was
/// rendered and when it was submitted (spec §4.3).
pub struct HoneypotTimingHandler;

impl NodeHandler for HoneypotTimingHandler {
    fn evaluate(&self, ctx: &RequestContext, config: &serde_json::Value) -> HandlerOutput {
        let config: Config = serde_json::from_value(config.clone()).unwrap_or_default();

        let Some(rendered_at_ms) = ctx
            .form_fields
            .get(&config.field)
            .and_then(|raw| raw.parse::<i64>().ok())
        else {
            return if config.required {
                HandlerOutput {
                    outcome_label: "blocked".to_string(),
                    score_delta: 0.0,
                    flags: vec!["missing_timing_token".to_string()],
                    details: serde_json::Value::Null,
                }
            } else {
                HandlerOutput::new("continue")
            };
        };

        let elapsed_seconds = (chrono::Utc::now().timestamp_millis() - rendered_at_ms) as f64 / 1000.0;
        if elapsed_seconds < config.min_interaction_seconds {
            HandlerOutput {
                outcome_label: "blocked".to_string(),
                score_delta: 0.0,
                flags: vec!["submitted_too_fast".to_string()],
                details: serde_json::json!({ "elapsed_seconds": elapsed_seconds }),
            }
        } else {
            HandlerOutput::new("continue")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx(fields: &[(&str, &str)]) -> RequestContext {
        RequestContext {
            host: "example.com".into(),
            path: "/submit".into(),
            method: "POST".into(),
            client_ip: "127.0.0.1".into(),
            headers: HashMap::new(),
            form_fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            form_hash: "h".into(),
            submission_fingerprint: "fp".into(),
            vhost_id: "default".into(),
            endpoint_id: "ep".into(),
        }
    }

    #[test]
    fn submission_faster_than_floor_blocks() {
        let now = chrono::Utc::now().timestamp_millis();
        let output = HoneypotTimingHandler.evaluate(
            &ctx(&[("_waf_ts", &now.to_string())]),
            &serde_json::json!({ "min_interaction_seconds": 5.0 }),
        );
        assert_eq!(output.outcome_label, "blocked");
    }

    #[test]
    fn missing_token_continues_when_not_required() {
        let output = HoneypotTimingHandler.evaluate(&ctx(&[]), &serde_json::Value::Null);
        assert_eq!(output.outcome_label, "continue");
    }

    #[test]
    fn missing_token_blocks_when_required() {
        let output = HoneypotTimingHandler.evaluate(&ctx(&[]), &serde_json::json!({ "required": true }));
        assert_eq!(output.outcome_label, "blocked");
    }
}
