//! Config Resolver: merges global/vhost/endpoint layers into an effective
//! configuration for one matched endpoint (spec §4.2).

use crate::cache::CacheSnapshot;
use crate::matcher::MatchResult;
use crate::model::{Endpoint, Mode, ProfileRef, RoutingConfig, ThresholdsConfig, TimingConfig};

/// The effective, fully-merged configuration at a point of use (spec §4.2
/// "Resolves the effective configuration at a point of use").
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub thresholds: ThresholdsConfig,
    pub routing: RoutingConfig,
    pub timing: TimingConfig,
    pub mode: Mode,
    pub defense_profiles: Vec<ProfileRef>,
    pub skip_waf: bool,
    pub skip_reason: Option<String>,
}

/// Resolve the effective configuration for the endpoint named in `match_result`
/// (spec §4.2: global → vhost → endpoint, later overrides earlier).
pub fn resolve(cache: &CacheSnapshot, match_result: &MatchResult, endpoint: &Endpoint) -> EffectiveConfig {
    let vhost = cache.vhosts.get(&match_result.vhost_id);

    let mode = endpoint
        .mode
        .or_else(|| vhost.and_then(|v| v.default_mode))
        .unwrap_or(cache.global.mode);

    let thresholds = ThresholdsConfig::merge(
        &ThresholdsConfig::merge(
            &cache.global.thresholds,
            &vhost
                .and_then(|v| v.default_thresholds.clone())
                .unwrap_or_default(),
        ),
        &endpoint.thresholds.clone().unwrap_or_default(),
    );

    let routing = RoutingConfig::merge(
        &RoutingConfig::merge(
            &cache.global.routing,
            &vhost.and_then(|v| v.default_routing.clone()).unwrap_or_default(),
        ),
        &endpoint.routing.clone().unwrap_or_default(),
    );

    let timing = TimingConfig::merge(
        &TimingConfig::merge(
            &cache.global.timing,
            &vhost.and_then(|v| v.default_timing.clone()).unwrap_or_default(),
        ),
        &endpoint.timing.clone().unwrap_or_default(),
    );

    let defense_profiles = if !endpoint.defense_profiles.is_empty() {
        endpoint.defense_profiles.clone()
    } else {
        vhost
            .and_then(|v| v.default_defense_profiles.clone())
            .unwrap_or_default()
    };

    let skip_waf = mode == Mode::Passthrough;
    let skip_reason = skip_waf.then(|| "mode:passthrough".to_string());

    EffectiveConfig {
        thresholds,
        routing,
        timing,
        mode,
        defense_profiles,
        skip_waf,
        skip_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{EndpointMatchType, VhostMatchType};
    use crate::model::{AggregationPolicy, MatchClause, MethodSet, Timestamps, VirtualHost, DEFAULT_VHOST_ID};

    fn base_endpoint() -> Endpoint {
        Endpoint {
            id: "ep".to_string(),
            vhost_id: Some(DEFAULT_VHOST_ID.to_string()),
            matcher: MatchClause {
                exact_paths: vec!["/submit".to_string()],
                path_prefix: None,
                regex: None,
                methods: MethodSet::Any,
            },
            priority: 0,
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
    fn passthrough_mode_short_circuits() {
        let mut cache = CacheSnapshot::default();
        cache.global.mode = Mode::Passthrough;
        cache.vhosts.insert(
            DEFAULT_VHOST_ID.to_string(),
            VirtualHost {
                id: DEFAULT_VHOST_ID.to_string(),
                hostnames: vec!["_".to_string()],
                priority: 0,
                enabled: true,
                default_thresholds: None,
                default_timing: None,
                default_mode: None,
                default_routing: None,
                default_defense_profiles: None,
                metadata: Timestamps::now(),
            },
        );
        let match_result = MatchResult {
            vhost_id: DEFAULT_VHOST_ID.to_string(),
            vhost_match_type: VhostMatchType::Default,
            endpoint_id: "ep".to_string(),
            endpoint_match_type: EndpointMatchType::ExactPath,
        };
        let effective = resolve(&cache, &match_result, &base_endpoint());
        assert!(effective.skip_waf);
        assert_eq!(effective.skip_reason.as_deref(), Some("mode:passthrough"));
    }

    #[test]
    fn endpoint_mode_overrides_global() {
        let mut cache = CacheSnapshot::default();
        cache.global.mode = Mode::Blocking;
        let mut endpoint = base_endpoint();
        endpoint.mode = Some(Mode::Monitoring);
        let match_result = MatchResult {
            vhost_id: DEFAULT_VHOST_ID.to_string(),
            vhost_match_type: VhostMatchType::Default,
            endpoint_id: "ep".to_string(),
            endpoint_match_type: EndpointMatchType::ExactPath,
        };
        let effective = resolve(&cache, &match_result, &endpoint);
        assert_eq!(effective.mode, Mode::Monitoring);
    }
}
