//! Attack Signature entity (spec §3, §4.4, §4.5).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Timestamps;

/// A `{pattern, score}` pair — one independently-scored rule (spec §4.4
/// "List of `{pattern, score}` pairs").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPattern {
    pub pattern: String,
    pub score: f64,
}

/// The contents of one signature section, field-typed per spec §4.4's
/// merge-rule table. A section is a generic bag of the five field
/// categories the table defines, keyed by field name within each category
/// (e.g. `literal_lists["blocked_keywords"]`), plus a catch-all for fields
/// the table doesn't name (spec §9: "when no rule applies, the overlay
/// keeps the highest-priority signature's value").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignatureSection {
    /// Set-like concatenation, de-duplicated, first-occurrence order
    /// preserved.
    pub literal_lists: HashMap<String, Vec<String>>,
    /// Concatenation, no de-duplication.
    pub scored_pattern_lists: HashMap<String, Vec<ScoredPattern>>,
    /// Ceiling fields (rate limits, timeouts): minimum wins.
    pub numeric_ceilings: HashMap<String, f64>,
    /// Floor fields (minimum interaction time): maximum wins.
    pub numeric_floors: HashMap<String, f64>,
    /// Boolean requirement flags: logical OR.
    pub bool_flags: HashMap<String, bool>,
    pub required_fields: Vec<String>,
    pub forbidden_fields: Vec<String>,
    /// Fields not covered by any of the above categories. Merged by
    /// highest-priority-wins (lowest numeric priority first) — see
    /// `signature_merge::merge_signatures`.
    pub other: HashMap<String, serde_json::Value>,
}

/// A library of per-section patterns overlaid onto a profile's defense
/// nodes (spec §3, Glossary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackSignature {
    pub id: String,
    pub enabled: bool,
    pub builtin: bool,
    pub priority: i64,
    pub tags: Vec<String>,
    /// Section name matches a defense-node `kind` (e.g. `"keyword_filter"`).
    pub sections: HashMap<String, SignatureSection>,
    /// Monotonically increasing; part of the merge memoization key
    /// (spec §4.5).
    pub version: u64,
    pub metadata: Timestamps,
}
