//! Fingerprint Profile entity (spec §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FpAction {
    Allow,
    Block,
    Flag,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionVerb {
    Present,
    Absent,
    Matches,
    NotMatches,
}

/// One per-header condition in a fingerprint's matching clause (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintCondition {
    pub header: String,
    pub verb: ConditionVerb,
    /// Required when `verb` is `Matches`/`NotMatches`.
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintMatch {
    pub mode: MatchMode,
    pub conditions: Vec<FingerprintCondition>,
}

impl FingerprintMatch {
    /// Evaluate the matching clause against a set of request headers.
    /// `lookup` should be case-insensitive; pattern conditions use the
    /// compiled mini-pattern language (spec §6.3) via `pattern_matches`.
    pub fn evaluate<F, P>(&self, lookup: F, pattern_matches: P) -> bool
    where
        F: Fn(&str) -> Option<String>,
        P: Fn(&str, &str) -> bool,
    {
        let mut results = self.conditions.iter().map(|cond| {
            let value = lookup(&cond.header);
            match cond.verb {
                ConditionVerb::Present => value.is_some(),
                ConditionVerb::Absent => value.is_none(),
                ConditionVerb::Matches => value
                    .as_deref()
                    .zip(cond.pattern.as_deref())
                    .map(|(v, p)| pattern_matches(p, v))
                    .unwrap_or(false),
                ConditionVerb::NotMatches => value
                    .as_deref()
                    .zip(cond.pattern.as_deref())
                    .map(|(v, p)| !pattern_matches(p, v))
                    .unwrap_or(true),
            }
        });
        match self.mode {
            MatchMode::All => results.all(|r| r),
            MatchMode::Any => results.any(|r| r),
        }
    }
}

/// Fingerprint-header selection for submission-fingerprint computation
/// (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintHeaderSelection {
    pub headers: Vec<String>,
    pub normalize: bool,
    pub length_cap: usize,
    pub include_field_names: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u64,
}

/// An early classifier over request headers (spec §3, Glossary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProfile {
    pub id: String,
    pub priority: i64,
    pub action: FpAction,
    pub score: f64,
    pub matcher: FingerprintMatch,
    pub header_selection: FingerprintHeaderSelection,
    pub rate_limit: Option<RateLimitConfig>,
}
