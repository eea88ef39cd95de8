//! `keyword_filter` built-in node (spec §4.3).

use std::sync::Arc;

use serde::Deserialize;

use crate::cache::LocalCache;
use crate::graph::{HandlerOutput, NodeHandler};
use crate::request::RequestContext;

/// Per-node config overrides; every field is optional so a bare `{}`
/// config scans every form field with the default scores.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    /// Restrict the scan to these field names; `None` scans all of them.
    fields: Option<Vec<String>>,
    block_score: f64,
    flag_score: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fields: None,
            block_score: 10.0,
            flag_score: 2.0,
        }
    }
}

/// Scans form field values against the cache's global `blocked_keywords` /
/// `flagged_keywords` sets (spec §4.3). Blocked hits win over flagged hits;
/// within a hit class every matching keyword's score contributes.
pub struct KeywordFilterHandler {
    cache: Arc<LocalCache>,
}

impl KeywordFilterHandler {
    pub fn new(cache: Arc<LocalCache>) -> Self {
        Self { cache }
    }
}

impl NodeHandler for KeywordFilterHandler {
    fn evaluate(&self, ctx: &RequestContext, config: &serde_json::Value) -> HandlerOutput {
        let config: Config = serde_json::from_value(config.clone()).unwrap_or_default();
        let snapshot = self.cache.snapshot();

        let values: Vec<&str> = ctx
            .form_fields
            .iter()
            .filter(|(name, _)| match &config.fields {
                Some(allowed) => allowed.iter().any(|n| n == *name),
                None => true,
            })
            .map(|(_, v)| v.as_str())
            .collect();

        let mut blocked_hits = Vec::new();
        let mut flagged_score = 0.0;
        let mut flagged_hits = Vec::new();

        for value in &values {
            let lower = value.to_ascii_lowercase();
            for keyword in &snapshot.blocked_keywords {
                if lower.contains(&keyword.to_ascii_lowercase()) {
                    blocked_hits.push(keyword.clone());
                }
            }
            for (keyword, score) in &snapshot.flagged_keywords {
                if lower.contains(&keyword.to_ascii_lowercase()) {
                    flagged_score += score;
                    flagged_hits.push(keyword.clone());
                }
            }
        }

        if !blocked_hits.is_empty() {
            blocked_hits.sort();
            blocked_hits.dedup();
            return HandlerOutput {
                outcome_label: "blocked".to_string(),
                score_delta: config.block_score * blocked_hits.len() as f64,
                flags: vec!["blocked_keyword_match".to_string()],
                details: serde_json::json!({ "matched": blocked_hits }),
            };
        }

        if !flagged_hits.is_empty() {
            flagged_hits.sort();
            flagged_hits.dedup();
            return HandlerOutput {
                outcome_label: "flagged".to_string(),
                score_delta: flagged_score.max(config.flag_score),
                flags: vec!["flagged_keyword_match".to_string()],
                details: serde_json::json!({ "matched": flagged_hits }),
            };
        }

        HandlerOutput::new("continue")
    }
}
