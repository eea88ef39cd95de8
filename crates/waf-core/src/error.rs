//! Error taxonomy for the WAF core (spec §7).
//!
//! Each kind here corresponds to one of the error categories the
//! specification distinguishes. None of these are meant to surface as a 5xx
//! to a client on the data-plane path when the endpoint mode is `blocking` —
//! callers translate them into `default_action` instead (§7 "Propagation").

use thiserror::Error;

/// A single per-path validation failure, as produced by graph or entity
/// validation. Carries a JSON-pointer-ish path so an admin surface can point
/// at the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted/indexed path to the offending field, e.g. `graph.nodes[3].outputs`.
    pub path: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Why a profile's wall-clock budget was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    /// Soft budget (`max_execution_time_ms`) exceeded; execution continues
    /// with a warning flag recorded.
    Soft,
    /// Hard ceiling (10x the soft budget) exceeded; execution aborts.
    Hard,
}

/// Top-level error type for `waf-core`.
///
/// Mirrors the error kinds named in spec §7. `ValidationError` is the only
/// variant an admin surface should render as a 4xx; every other variant is
/// something the data-plane path absorbs into a `default_action` decision.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bad input from the admin surface: malformed graph, unknown output
    /// label, overlapping threshold ranges, missing required fields.
    #[error("validation failed with {} issue(s): {}", .0.len(), summarize(.0))]
    Validation(Vec<ValidationIssue>),

    /// The store was unavailable, or a single operation against it failed.
    #[error("store temporarily unavailable: {0}")]
    TransientStore(String),

    /// A referenced profile or signature id does not exist in the cache.
    #[error("{kind} '{id}' referenced but not found in cache")]
    ConfigMissing {
        /// What kind of entity was missing (e.g. "defense_profile").
        kind: &'static str,
        /// The id that could not be resolved.
        id: String,
    },

    /// A profile's wall-clock budget was exceeded.
    #[error("profile '{profile_id}' exceeded its {kind:?} execution budget")]
    BudgetExceeded {
        profile_id: String,
        kind: BudgetKind,
    },

    /// Defensive cycle check tripped during DAG traversal.
    #[error("cycle detected in profile '{profile_id}' at node '{node_id}'")]
    CycleDetected {
        profile_id: String,
        node_id: String,
    },

    /// A signature pattern failed to compile; the containing rule is
    /// skipped, processing continues.
    #[error("pattern '{pattern}' failed to compile: {reason}")]
    PatternCompile { pattern: String, reason: String },

    /// A CAPTCHA/reputation/webhook/SSO provider call failed.
    #[error("provider '{provider}' call failed: {reason}")]
    Provider { provider: String, reason: String },
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        Error::Validation(issues)
    }

    pub fn config_missing(kind: &'static str, id: impl Into<String>) -> Self {
        Error::ConfigMissing {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_joins_issues() {
        let err = Error::validation(vec![
            ValidationIssue::new("graph.start", "missing"),
            ValidationIssue::new("graph.nodes[2]", "dangling edge"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 issue"));
        assert!(msg.contains("missing"));
        assert!(msg.contains("dangling edge"));
    }

    #[test]
    fn config_missing_constructor() {
        let err = Error::config_missing("defense_profile", "strict-api");
        match err {
            Error::ConfigMissing { kind, id } => {
                assert_eq!(kind, "defense_profile");
                assert_eq!(id, "strict-api");
            }
            _ => panic!("wrong variant"),
        }
    }
}
