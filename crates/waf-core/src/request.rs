//! Request-scoped types: the decision vocabulary and the context threaded
//! through resolution, graph execution, and orchestration (spec §4.4, §6.2).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The terminal outcome an `action` node (or a profile's `default_action`)
/// resolves to (spec §4.4 "Outcome semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Allow,
    Block,
    /// Blocked after waiting `delay_seconds` (see [`Decision::tarpit_delay`]).
    Tarpit,
    /// Challenge via a named provider (see [`Decision::provider`]).
    Captcha,
    /// Allowed, but recorded with a reason and score.
    Flag,
    /// Allowed; blocking semantics suppressed system-wide for this request.
    Monitor,
}

impl ActionKind {
    /// Whether this outcome counts as "blocking" for `OR`/`AND`/`MAJORITY`
    /// decision aggregation (spec §4.6): block, tarpit, and captcha all
    /// count; allow, flag, and monitor do not.
    pub fn is_blocking(self) -> bool {
        matches!(self, ActionKind::Block | ActionKind::Tarpit | ActionKind::Captcha)
    }
}

/// A non-blocking annotation recorded against a decision (spec §4.4: warning
/// flags for soft-budget overrun, timeout, provider failure, etc).
pub type Flag = String;

/// The result of evaluating one defense profile, or the aggregate across
/// several (spec §4.6, §6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub action: ActionKind,
    pub score: f64,
    pub flags: Vec<Flag>,
    pub reason: Option<String>,
    pub tarpit_delay_seconds: Option<f64>,
    pub provider: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            action: ActionKind::Allow,
            score: 0.0,
            flags: vec![],
            reason: None,
            tarpit_delay_seconds: None,
            provider: None,
        }
    }

    pub fn with_flag(mut self, flag: impl Into<Flag>) -> Self {
        self.flags.push(flag.into());
        self
    }
}

/// Everything a profile's graph execution and the orchestrator need about
/// one incoming request; built once by the gateway handler and read-shared
/// across parallel profile executions (spec §4.4 "no shared mutable request
/// state is exposed to parallel profiles" — this type is immutable after
/// construction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub host: String,
    pub path: String,
    pub method: String,
    pub client_ip: String,
    pub headers: HashMap<String, String>,
    pub form_fields: HashMap<String, String>,
    pub form_hash: String,
    pub submission_fingerprint: String,
    pub vhost_id: String,
    pub endpoint_id: String,
}

impl RequestContext {
    pub fn header(&self, name: &str) -> Option<&str> {
        let lower = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_ascii_lowercase() == lower)
            .map(|(_, v)| v.as_str())
    }
}
