//! Early header classifier lookup (spec §3 "Fingerprint profile — an early
//! classifier over request headers"). Evaluated before the defense-profile
//! graph: the first enabled profile (by ascending priority, then id) whose
//! matching clause is satisfied determines both the submission fingerprint's
//! header selection and, for `block`/`allow`, an immediate decision that
//! skips graph execution entirely.

use std::collections::HashMap;

use waf_core::model::{FingerprintHeaderSelection, FingerprintProfile};

pub struct FingerprintSelection<'a> {
    pub profile: Option<&'a FingerprintProfile>,
    pub header_selection: FingerprintHeaderSelection,
}

/// Used when no fingerprint profile matches a request, so every request
/// still produces a stable `submission_fingerprint`.
fn default_header_selection() -> FingerprintHeaderSelection {
    FingerprintHeaderSelection {
        headers: vec!["user-agent".to_string(), "accept-language".to_string()],
        normalize: true,
        length_cap: 256,
        include_field_names: false,
    }
}

pub fn select<'a>(profiles: &'a [FingerprintProfile], headers: &HashMap<String, String>) -> FingerprintSelection<'a> {
    let lookup = |name: &str| -> Option<String> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };
    let pattern_matches = |pattern: &str, value: &str| -> bool {
        regex::Regex::new(pattern).is_ok_and(|re| re.is_match(value))
    };

    let mut ordered: Vec<&FingerprintProfile> = profiles.iter().collect();
    ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

    for profile in ordered {
        if profile.matcher.evaluate(lookup, pattern_matches) {
            return FingerprintSelection {
                profile: Some(profile),
                header_selection: profile.header_selection.clone(),
            };
        }
    }

    FingerprintSelection {
        profile: None,
        header_selection: default_header_selection(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waf_core::model::{ConditionVerb, FingerprintCondition, FingerprintMatch, FpAction, MatchMode};

    fn profile(id: &str, priority: i64, header: &str) -> FingerprintProfile {
        FingerprintProfile {
            id: id.to_string(),
            priority,
            action: FpAction::Flag,
            score: 1.0,
            matcher: FingerprintMatch {
                mode: MatchMode::All,
                conditions: vec![FingerprintCondition {
                    header: header.to_string(),
                    verb: ConditionVerb::Present,
                    pattern: None,
                }],
            },
            header_selection: FingerprintHeaderSelection {
                headers: vec![header.to_string()],
                normalize: false,
                length_cap: 64,
                include_field_names: true,
            },
            rate_limit: None,
        }
    }

    #[test]
    fn first_matching_profile_by_priority_wins() {
        let profiles = vec![profile("low-priority", 10, "x-custom"), profile("high-priority", 0, "x-custom")];
        let mut headers = HashMap::new();
        headers.insert("X-Custom".to_string(), "1".to_string());
        let selection = select(&profiles, &headers);
        assert_eq!(selection.profile.unwrap().id, "high-priority");
    }

    #[test]
    fn falls_back_to_default_selection_when_nothing_matches() {
        let profiles = vec![profile("needs-header", 0, "x-custom")];
        let selection = select(&profiles, &HashMap::new());
        assert!(selection.profile.is_none());
        assert_eq!(selection.header_selection.headers, vec!["user-agent", "accept-language"]);
    }
}
