//! Virtual Host entity (spec §3, §4.1).

use super::Timestamps;
use serde::{Deserialize, Serialize};

/// The id of the always-present, non-deletable default vhost (spec §3:
/// "Exactly one default vhost always exists and is non-deletable").
pub const DEFAULT_VHOST_ID: &str = "default";

/// A virtual host: hostname-pattern-indexed configuration scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualHost {
    pub id: String,
    /// Ordered list of raw hostname patterns. Classified at match time by
    /// [`classify_host_pattern`] — see spec §4.1 for the four classes.
    pub hostnames: Vec<String>,
    pub priority: i64,
    pub enabled: bool,

    pub default_thresholds: Option<super::ThresholdsConfig>,
    pub default_timing: Option<super::TimingConfig>,
    pub default_mode: Option<super::Mode>,
    pub default_routing: Option<super::RoutingConfig>,
    /// Defense-profile references applied when an endpoint under this vhost
    /// does not declare its own.
    pub default_defense_profiles: Option<Vec<super::ProfileRef>>,

    pub metadata: Timestamps,
}

impl VirtualHost {
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_VHOST_ID
    }
}

/// Which of the four ordered host-resolution classes a pattern belongs to
/// (spec §4.1). Lower variants are tried first; `Ord` reflects search order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum HostPatternClass {
    /// Exact hostname (case-insensitive).
    Exact(String),
    /// `*.suffix` — matches any hostname with at least one extra leading
    /// label beyond `suffix`.
    LabelWildcard { suffix: String },
    /// Any other pattern containing `*` — matched by per-label comparison.
    Positional { labels: Vec<String> },
    /// `_` or `*` alone — catch-all sentinel.
    CatchAll,
}

/// Classify a raw hostname pattern string into its matching class
/// (spec §4.1, classes 1-4, and §9's fixed positional-wildcard behavior).
pub fn classify_host_pattern(pattern: &str) -> HostPatternClass {
    let lower = pattern.to_ascii_lowercase();
    if lower == "_" || lower == "*" {
        return HostPatternClass::CatchAll;
    }
    if let Some(suffix) = lower.strip_prefix("*.") {
        if !suffix.contains('*') {
            return HostPatternClass::LabelWildcard {
                suffix: suffix.to_string(),
            };
        }
    }
    if lower.contains('*') {
        return HostPatternClass::Positional {
            labels: lower.split('.').map(str::to_string).collect(),
        };
    }
    HostPatternClass::Exact(lower)
}

/// Does `host` (already lowercased) match the given pattern class?
pub fn host_matches(host: &str, class: &HostPatternClass) -> bool {
    match class {
        HostPatternClass::Exact(exact) => host == exact,
        HostPatternClass::LabelWildcard { suffix } => {
            host != *suffix
                && (host.ends_with(suffix.as_str())
                    && host.as_bytes()[host.len() - suffix.len() - 1] == b'.')
        }
        HostPatternClass::Positional { labels } => {
            let host_labels: Vec<&str> = host.split('.').collect();
            if host_labels.len() != labels.len() {
                return false;
            }
            host_labels
                .iter()
                .zip(labels.iter())
                .all(|(h, p)| p == "*" || h == p)
        }
        HostPatternClass::CatchAll => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_exact() {
        assert_eq!(
            classify_host_pattern("Example.com"),
            HostPatternClass::Exact("example.com".into())
        );
    }

    #[test]
    fn classifies_label_wildcard() {
        assert_eq!(
            classify_host_pattern("*.example.com"),
            HostPatternClass::LabelWildcard {
                suffix: "example.com".into()
            }
        );
    }

    #[test]
    fn classifies_positional_wildcard() {
        assert_eq!(
            classify_host_pattern("www.*.example.com"),
            HostPatternClass::Positional {
                labels: vec!["www".into(), "*".into(), "example".into(), "com".into()]
            }
        );
    }

    #[test]
    fn classifies_catch_all() {
        assert_eq!(classify_host_pattern("_"), HostPatternClass::CatchAll);
        assert_eq!(classify_host_pattern("*"), HostPatternClass::CatchAll);
    }

    #[test]
    fn label_wildcard_requires_extra_leading_label() {
        let class = classify_host_pattern("*.example.com");
        assert!(host_matches("sub.example.com", &class));
        assert!(!host_matches("example.com", &class));
        assert!(host_matches("a.b.example.com", &class));
    }

    #[test]
    fn positional_wildcard_matches_one_label() {
        let class = classify_host_pattern("www.*.example.com");
        assert!(host_matches("www.foo.example.com", &class));
        assert!(!host_matches("www.foo.bar.example.com", &class));
        assert!(!host_matches("www.example.com", &class));
    }
}
