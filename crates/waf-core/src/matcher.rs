//! Host & Path Matcher (spec §4.1).
//!
//! Pure functions over a [`CacheSnapshot`] — no I/O, no suspension, so the
//! executor can call them inline on the request's task.

use crate::cache::CacheSnapshot;
use crate::model::{classify_host_pattern, host_matches, Endpoint, VirtualHost, DEFAULT_VHOST_ID};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VhostMatchType {
    Exact,
    LabelWildcard,
    Positional,
    CatchAll,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointMatchType {
    ExactPath,
    PathPrefix,
    Regex,
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub vhost_id: String,
    pub vhost_match_type: VhostMatchType,
    pub endpoint_id: String,
    pub endpoint_match_type: EndpointMatchType,
}

/// Resolve `(host, path, method)` to a vhost and endpoint (spec §4.1).
pub fn resolve(cache: &CacheSnapshot, host: &str, path: &str, method: &str) -> MatchResult {
    let host = host.to_ascii_lowercase();
    let (vhost, vhost_match_type) = match_host(cache, &host);

    if let Some(vhost) = &vhost {
        if let Some(endpoints) = cache.vhost_endpoints.get(&vhost.id) {
            if let Some((endpoint, match_type)) = match_path(endpoints, path, method) {
                return MatchResult {
                    vhost_id: vhost.id.clone(),
                    vhost_match_type,
                    endpoint_id: endpoint.id.clone(),
                    endpoint_match_type: match_type,
                };
            }
        }
    }

    if let Some((endpoint, match_type)) = match_path(&cache.global_endpoints, path, method) {
        let vhost_id = vhost.map(|v| v.id).unwrap_or_else(|| DEFAULT_VHOST_ID.to_string());
        return MatchResult {
            vhost_id,
            vhost_match_type,
            endpoint_id: endpoint.id.clone(),
            endpoint_match_type: match_type,
        };
    }

    let vhost_id = vhost.map(|v| v.id).unwrap_or_else(|| DEFAULT_VHOST_ID.to_string());
    MatchResult {
        vhost_id,
        vhost_match_type,
        endpoint_id: Endpoint::synthetic_default().id,
        endpoint_match_type: EndpointMatchType::Synthetic,
    }
}

/// Four ordered host-resolution classes, falling through to the default
/// vhost if nothing matches (spec §4.1 "Host resolution").
fn match_host<'a>(cache: &'a CacheSnapshot, host: &str) -> (Option<VirtualHost>, VhostMatchType) {
    let mut exact = Vec::new();
    let mut label_wildcard = Vec::new();
    let mut positional = Vec::new();
    let mut catch_all = Vec::new();

    for vhost in cache.vhosts.values() {
        if !vhost.enabled {
            continue;
        }
        for pattern in &vhost.hostnames {
            let class = classify_host_pattern(pattern);
            if host_matches(host, &class) {
                match class {
                    crate::model::HostPatternClass::Exact(_) => exact.push(vhost),
                    crate::model::HostPatternClass::LabelWildcard { .. } => label_wildcard.push(vhost),
                    crate::model::HostPatternClass::Positional { .. } => positional.push(vhost),
                    crate::model::HostPatternClass::CatchAll => catch_all.push(vhost),
                }
            }
        }
    }

    let pick = |mut candidates: Vec<&'a VirtualHost>| -> Option<&'a VirtualHost> {
        candidates.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        candidates.into_iter().next()
    };

    if let Some(v) = pick(exact) {
        return (Some(v.clone()), VhostMatchType::Exact);
    }
    if let Some(v) = pick(label_wildcard) {
        return (Some(v.clone()), VhostMatchType::LabelWildcard);
    }
    if let Some(v) = pick(positional) {
        return (Some(v.clone()), VhostMatchType::Positional);
    }
    if let Some(v) = pick(catch_all) {
        return (Some(v.clone()), VhostMatchType::CatchAll);
    }

    (
        cache.vhosts.get(DEFAULT_VHOST_ID).cloned(),
        VhostMatchType::Default,
    )
}

/// Three priority classes searched in order within one endpoint scope
/// (spec §4.1 "Path resolution"). A method mismatch inside a class does
/// not advance to a lower class.
fn match_path<'a>(
    endpoints: &'a [Endpoint],
    path: &str,
    method: &str,
) -> Option<(&'a Endpoint, EndpointMatchType)> {
    let mut enabled: Vec<&Endpoint> = endpoints.iter().filter(|e| e.enabled).collect();
    enabled.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

    let exact_candidates: Vec<&Endpoint> = enabled
        .iter()
        .filter(|e| e.matcher.exact_paths.iter().any(|p| p == path))
        .copied()
        .collect();
    if !exact_candidates.is_empty() {
        return exact_candidates
            .into_iter()
            .find(|e| e.matcher.methods.matches(method))
            .map(|e| (e, EndpointMatchType::ExactPath));
    }

    let mut prefix_candidates: Vec<&Endpoint> = enabled
        .iter()
        .filter(|e| {
            e.matcher
                .path_prefix
                .as_deref()
                .is_some_and(|prefix| path.starts_with(prefix))
        })
        .copied()
        .collect();
    if !prefix_candidates.is_empty() {
        prefix_candidates.sort_by(|a, b| {
            let a_len = a.matcher.path_prefix.as_deref().unwrap_or("").len();
            let b_len = b.matcher.path_prefix.as_deref().unwrap_or("").len();
            b_len.cmp(&a_len)
        });
        return prefix_candidates
            .into_iter()
            .find(|e| e.matcher.methods.matches(method))
            .map(|e| (e, EndpointMatchType::PathPrefix));
    }

    let regex_candidates: Vec<&Endpoint> = enabled
        .iter()
        .filter(|e| e.matcher.regex.is_some())
        .copied()
        .collect();
    for endpoint in regex_candidates {
        if let Some(pattern) = &endpoint.matcher.regex {
            if let Ok(re) = regex::Regex::new(pattern) {
                if re.is_match(path) && endpoint.matcher.methods.matches(method) {
                    return Some((endpoint, EndpointMatchType::Regex));
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AggregationPolicy, MatchClause, MethodSet, Mode, Timestamps};
    use std::collections::HashMap;

    fn endpoint(id: &str, prefix: Option<&str>, exact: Vec<&str>, priority: i64) -> Endpoint {
        Endpoint {
            id: id.to_string(),
            vhost_id: None,
            matcher: MatchClause {
                exact_paths: exact.into_iter().map(str::to_string).collect(),
                path_prefix: prefix.map(str::to_string),
                regex: None,
                methods: MethodSet::Any,
            },
            priority,
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

    #[test]
    fn exact_path_beats_prefix() {
        let endpoints = vec![
            endpoint("prefix", Some("/api"), vec![], 0),
            endpoint("exact", None, vec!["/api/submit"], 0),
        ];
        let (matched, match_type) = match_path(&endpoints, "/api/submit", "POST").unwrap();
        assert_eq!(matched.id, "exact");
        assert_eq!(match_type, EndpointMatchType::ExactPath);
    }

    #[test]
    fn longest_prefix_wins() {
        let endpoints = vec![
            endpoint("short", Some("/api"), vec![], 0),
            endpoint("long", Some("/api/submit"), vec![], 0),
        ];
        let (matched, _) = match_path(&endpoints, "/api/submit/form", "POST").unwrap();
        assert_eq!(matched.id, "long");
    }

    #[test]
    fn method_mismatch_does_not_fall_through_to_lower_class() {
        let mut exact = endpoint("exact", None, vec!["/submit"], 0);
        exact.matcher.methods = MethodSet::Some(["GET".to_string()].into_iter().collect());
        let endpoints = vec![exact, endpoint("prefix", Some("/"), vec![], 10)];
        assert!(match_path(&endpoints, "/submit", "POST").is_none());
    }

    #[test]
    fn resolve_falls_back_to_default_vhost_and_synthetic_endpoint() {
        let mut cache = CacheSnapshot::default();
        cache.vhosts.insert(
            DEFAULT_VHOST_ID.to_string(),
            VirtualHost {
                id: DEFAULT_VHOST_ID.to_string(),
                hostnames: vec!["_".to_string()],
                priority: 0,
                enabled: true,
                default_thresholds: None,
                default_timing: None,
                default_mode: Some(Mode::Blocking),
                default_routing: None,
                default_defense_profiles: None,
                metadata: Timestamps::now(),
            },
        );
        let result = resolve(&cache, "unknown.example.com", "/nope", "GET");
        assert_eq!(result.vhost_id, DEFAULT_VHOST_ID);
        assert_eq!(result.endpoint_match_type, EndpointMatchType::Synthetic);
        let _ = HashMap::<String, String>::new();
    }
}
