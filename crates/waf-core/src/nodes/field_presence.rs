//! `field_presence` built-in node (spec §4.3).

use serde::Deserialize;

use crate::graph::{HandlerOutput, NodeHandler};
use crate::request::RequestContext;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    required_fields: Vec<String>,
    forbidden_fields: Vec<String>,
}

/// Enforces `required_fields` / `forbidden_fields` from the merged
/// signature overlay (spec §4.3, §4.5's `SignatureSection` categories of
/// the same name).
pub struct FieldPresenceHandler;

impl NodeHandler for FieldPresenceHandler {
    fn evaluate(&self, ctx: &RequestContext, config: &serde_json::Value) -> HandlerOutput {
        let config: Config = serde_json::from_value(config.clone()).unwrap_or_default();

        let present: Vec<&String> = config
            .forbidden_fields
            .iter()
            .filter(|name| ctx.form_fields.contains_key(*name))
            .collect();
        if !present.is_empty() {
            return HandlerOutput {
                outcome_label: "blocked".to_string(),
                score_delta: 0.0,
                flags: vec!["forbidden_field_present".to_string()],
                details: serde_json::json!({ "fields": present }),
            };
        }

        let missing: Vec<&String> = config
            .required_fields
            .iter()
            .filter(|name| !ctx.form_fields.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return HandlerOutput {
                outcome_label: "blocked".to_string(),
                score_delta: 0.0,
                flags: vec!["required_field_missing".to_string()],
                details: serde_json::json!({ "fields": missing }),
            };
        }

        HandlerOutput::new("continue")
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
    fn missing_required_field_blocks() {
        let config = serde_json::json!({ "required_fields": ["email"] });
        let output = FieldPresenceHandler.evaluate(&ctx(&[("name", "alice")]), &config);
        assert_eq!(output.outcome_label, "blocked");
    }

    #[test]
    fn honeypot_field_present_blocks() {
        let config = serde_json::json!({ "forbidden_fields": ["website"] });
        let output = FieldPresenceHandler.evaluate(&ctx(&[("website", "spam")]), &config);
        assert_eq!(output.outcome_label, "blocked");
    }

    #[test]
    fn satisfied_constraints_continue() {
        let config = serde_json::json!({ "required_fields": ["email"], "forbidden_fields": ["website"] });
        let output = FieldPresenceHandler.evaluate(&ctx(&[("email", "a@b.com")]), &config);
        assert_eq!(output.outcome_label, "continue");
    }
}
