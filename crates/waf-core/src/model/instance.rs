//! Instance coordination records (spec §3, §4.8).

use serde::{Deserialize, Serialize};

/// Derived from heartbeat age, not stored directly (spec §4.8: drift vs.
/// down thresholds against the leader's own clock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Active,
    Drifted,
    Down,
}

/// A running WAF process's coordination record (spec §3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub last_heartbeat_unix_ms: i64,
    pub is_leader: bool,
}

impl InstanceRecord {
    /// Classify against the leader-maintenance thresholds (spec §4.8:
    /// drift after 60s, removal after 300s of heartbeat silence).
    pub fn status(&self, now_unix_ms: i64, drift_after_ms: i64, down_after_ms: i64) -> InstanceStatus {
        let age = now_unix_ms.saturating_sub(self.last_heartbeat_unix_ms);
        if age >= down_after_ms {
            InstanceStatus::Down
        } else if age >= drift_after_ms {
            InstanceStatus::Drifted
        } else {
            InstanceStatus::Active
        }
    }
}
