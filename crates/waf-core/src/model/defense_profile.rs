//! Defense Profile entity (spec §3, §4.3).

use crate::graph::Graph;
use serde::{Deserialize, Serialize};

use super::Timestamps;

/// The decision a profile falls back to when its graph can't produce one
/// (validation failure, budget overrun, cycle, dangling edge with no
/// `continue` fallback) — spec §4.4, §7.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub default_action: crate::request::ActionKind,
    pub max_execution_time_ms: u64,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            default_action: crate::request::ActionKind::Allow,
            max_execution_time_ms: 50,
        }
    }
}

/// A named DAG configuring a detection policy (spec §3, Glossary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenseProfile {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub priority: i64,
    /// Builtin profiles can't be deleted by the admin surface (enforced
    /// there, not here — this core only records the flag).
    pub builtin: bool,
    pub settings: ProfileSettings,
    pub graph: Graph,
    /// Monotonically increasing; part of the signature-merge memoization
    /// key (spec §4.5).
    pub version: u64,
    pub metadata: Timestamps,
}
