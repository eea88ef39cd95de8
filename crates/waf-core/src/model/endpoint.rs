//! Endpoint entity (spec §3, §4.1).

use super::Timestamps;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tri-state per-endpoint execution mode (spec §4.2, Glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Blocking,
    Monitoring,
    Passthrough,
}

/// A method set on a match clause: either a concrete set of verbs or the
/// `*` wildcard (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodSet {
    Any,
    Some(HashSet<String>),
}

impl MethodSet {
    pub fn matches(&self, method: &str) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::Some(set) => set.contains(&method.to_ascii_uppercase()),
        }
    }
}

/// The path/method matching clause of an endpoint (spec §3, §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchClause {
    pub exact_paths: Vec<String>,
    pub path_prefix: Option<String>,
    pub regex: Option<String>,
    pub methods: MethodSet,
}

/// A profile reference attached to an endpoint or vhost default, with its
/// own priority/weight used by the orchestrator (spec §3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRef {
    pub profile_id: String,
    pub priority: i64,
    pub weight: f64,
}

/// A (profile, signature list) pair evaluated after base profiles
/// (spec §3, §4.6; Glossary "Defense line").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenseLine {
    pub profile_id: String,
    pub signature_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAggregation {
    Or,
    And,
    Majority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreAggregation {
    Sum,
    Max,
    WeightedAvg,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationPolicy {
    pub decision: DecisionAggregation,
    pub score: ScoreAggregation,
    pub short_circuit: bool,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            decision: DecisionAggregation::Or,
            score: ScoreAggregation::Max,
            short_circuit: true,
        }
    }
}

/// A path-and-method-indexed configuration scope, optionally nested inside
/// a vhost (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    /// `None` => global endpoint.
    pub vhost_id: Option<String>,
    pub matcher: MatchClause,
    pub priority: i64,
    pub enabled: bool,

    pub thresholds: Option<super::ThresholdsConfig>,
    pub mode: Option<Mode>,
    pub routing: Option<super::RoutingConfig>,
    pub timing: Option<super::TimingConfig>,

    pub defense_profiles: Vec<ProfileRef>,
    pub aggregation: AggregationPolicy,
    pub defense_lines: Vec<DefenseLine>,

    pub metadata: Timestamps,
}

impl Endpoint {
    /// A synthetic endpoint used when no endpoint matches at all (spec
    /// §4.1: "A nil result ... yields a synthetic 'default' endpoint that
    /// inherits only the global layer").
    pub fn synthetic_default() -> Self {
        Self {
            id: "__synthetic_default__".to_string(),
            vhost_id: None,
            matcher: MatchClause {
                exact_paths: vec![],
                path_prefix: None,
                regex: None,
                methods: MethodSet::Any,
            },
            priority: i64::MAX,
            enabled: true,
            thresholds: None,
            mode: None,
            routing: None,
            timing: None,
            defense_profiles: vec![],
            aggregation: AggregationPolicy::default(),
            defense_lines: vec![],
            metadata: Timestamps::now(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.id == "__synthetic_default__"
    }
}
