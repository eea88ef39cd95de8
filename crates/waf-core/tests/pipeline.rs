//! End-to-end exercises of matcher -> resolver -> orchestrator -> graph
//! execution against a hand-built cache snapshot, without a store or an
//! HTTP layer. Each scenario mirrors one of the request-path walkthroughs.

use std::collections::HashMap;
use std::sync::Arc;

use waf_core::cache::{CacheSnapshot, LocalCache};
use waf_core::graph::{Graph, Node, NodeRegistry, NodeSpec};
use waf_core::model::{
    AggregationPolicy, DecisionAggregation, Endpoint, MatchClause, MethodSet, Mode, ProfileRef,
    ProfileSettings, ScoreAggregation, Timestamps, VirtualHost, DEFAULT_VHOST_ID,
};
use waf_core::nodes;
use waf_core::orchestrator;
use waf_core::request::{ActionKind, RequestContext};
use waf_core::resolver;
use waf_core::{matcher, model::DefenseProfile};

fn vhost() -> VirtualHost {
    VirtualHost {
        id: DEFAULT_VHOST_ID.to_string(),
        hostnames: vec!["example.com".to_string()],
        priority: 0,
        enabled: true,
        default_thresholds: None,
        default_timing: None,
        default_mode: Some(Mode::Blocking),
        default_routing: None,
        default_defense_profiles: None,
        metadata: Timestamps::now(),
    }
}

fn endpoint(profile_id: &str) -> Endpoint {
    Endpoint {
        id: "contact-form".to_string(),
        vhost_id: Some(DEFAULT_VHOST_ID.to_string()),
        matcher: MatchClause {
            exact_paths: vec!["/contact".to_string()],
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
        defense_profiles: vec![ProfileRef {
            profile_id: profile_id.to_string(),
            priority: 0,
            weight: 1.0,
        }],
        aggregation: AggregationPolicy {
            decision: DecisionAggregation::Or,
            score: ScoreAggregation::Sum,
            short_circuit: false,
        },
        defense_lines: vec![],
        metadata: Timestamps::now(),
    }
}

/// A `keyword_filter` scan routed to explicit block/allow action nodes —
/// the shape the admin surface would author for a minimal spam-check
/// profile.
fn keyword_filter_profile(id: &str) -> DefenseProfile {
    let mut nodes = HashMap::new();
    let mut scan_outputs = HashMap::new();
    scan_outputs.insert("blocked".to_string(), "block".to_string());
    scan_outputs.insert("continue".to_string(), "allow".to_string());
    nodes.insert(
        "scan".to_string(),
        Node {
            id: "scan".to_string(),
            spec: NodeSpec::Defense {
                handler: "keyword_filter".to_string(),
                config: serde_json::json!({}),
            },
            outputs: scan_outputs,
        },
    );
    nodes.insert(
        "block".to_string(),
        Node {
            id: "block".to_string(),
            spec: NodeSpec::Action {
                action: ActionKind::Block,
                reason: Some("blocked_keyword_match".to_string()),
                delay_seconds: None,
                provider: None,
            },
            outputs: HashMap::new(),
        },
    );
    nodes.insert(
        "allow".to_string(),
        Node {
            id: "allow".to_string(),
            spec: NodeSpec::Action {
                action: ActionKind::Allow,
                reason: None,
                delay_seconds: None,
                provider: None,
            },
            outputs: HashMap::new(),
        },
    );

    DefenseProfile {
        id: id.to_string(),
        name: id.to_string(),
        enabled: true,
        priority: 0,
        builtin: false,
        settings: ProfileSettings::default(),
        graph: Graph {
            start: "scan".to_string(),
            nodes,
        },
        version: 1,
        metadata: Timestamps::now(),
    }
}

fn request_context(vhost_id: &str, endpoint_id: &str, fields: &[(&str, &str)]) -> RequestContext {
    RequestContext {
        host: "example.com".to_string(),
        path: "/contact".to_string(),
        method: "POST".to_string(),
        client_ip: "203.0.113.9".to_string(),
        headers: HashMap::new(),
        form_fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        form_hash: "irrelevant".to_string(),
        submission_fingerprint: "irrelevant".to_string(),
        vhost_id: vhost_id.to_string(),
        endpoint_id: endpoint_id.to_string(),
    }
}

fn registry(cache: Arc<LocalCache>) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    nodes::register_builtins(&mut registry, cache);
    registry
}

#[tokio::test]
async fn a_submission_containing_a_blocked_keyword_is_blocked() {
    let cache = Arc::new(LocalCache::new());
    let mut snapshot = CacheSnapshot::default();
    snapshot.vhosts.insert(DEFAULT_VHOST_ID.to_string(), vhost());
    snapshot
        .vhost_endpoints
        .insert(DEFAULT_VHOST_ID.to_string(), vec![endpoint("spam-check")]);
    snapshot
        .defense_profiles
        .insert("spam-check".to_string(), keyword_filter_profile("spam-check"));
    snapshot.blocked_keywords = vec!["viagra".to_string()];
    snapshot.version = 1;
    cache.swap(snapshot);

    let cache_snapshot = cache.snapshot();
    let registry = registry(cache.clone());

    let match_result = matcher::resolve(&cache_snapshot, "example.com", "/contact", "POST");
    assert_eq!(match_result.vhost_id, DEFAULT_VHOST_ID);
    assert_eq!(match_result.endpoint_id, "contact-form");

    let endpoint = cache_snapshot.vhost_endpoints[&match_result.vhost_id]
        .iter()
        .find(|e| e.id == match_result.endpoint_id)
        .unwrap()
        .clone();
    let effective = resolver::resolve(&cache_snapshot, &match_result, &endpoint);
    assert_eq!(effective.mode, Mode::Blocking);
    assert!(!effective.skip_waf);

    let ctx = request_context(
        &match_result.vhost_id,
        &match_result.endpoint_id,
        &[("message", "buy cheap viagra now")],
    );

    let decision = orchestrator::orchestrate(
        &cache_snapshot,
        &registry,
        &ctx,
        &effective.defense_profiles,
        &endpoint.aggregation,
        &endpoint.defense_lines,
    )
    .await;

    assert_eq!(decision.action, ActionKind::Block);
    assert!(decision.score > 0.0);
}

#[tokio::test]
async fn a_clean_submission_passes_through_the_same_graph() {
    let cache = Arc::new(LocalCache::new());
    let mut snapshot = CacheSnapshot::default();
    snapshot.vhosts.insert(DEFAULT_VHOST_ID.to_string(), vhost());
    snapshot
        .vhost_endpoints
        .insert(DEFAULT_VHOST_ID.to_string(), vec![endpoint("spam-check")]);
    snapshot
        .defense_profiles
        .insert("spam-check".to_string(), keyword_filter_profile("spam-check"));
    snapshot.blocked_keywords = vec!["viagra".to_string()];
    snapshot.version = 1;
    cache.swap(snapshot);

    let cache_snapshot = cache.snapshot();
    let registry = registry(cache.clone());

    let match_result = matcher::resolve(&cache_snapshot, "example.com", "/contact", "POST");
    let endpoint = cache_snapshot.vhost_endpoints[&match_result.vhost_id]
        .iter()
        .find(|e| e.id == match_result.endpoint_id)
        .unwrap()
        .clone();
    let effective = resolver::resolve(&cache_snapshot, &match_result, &endpoint);

    let ctx = request_context(
        &match_result.vhost_id,
        &match_result.endpoint_id,
        &[("message", "hello, I'd like a quote")],
    );

    let decision = orchestrator::orchestrate(
        &cache_snapshot,
        &registry,
        &ctx,
        &effective.defense_profiles,
        &endpoint.aggregation,
        &endpoint.defense_lines,
    )
    .await;

    assert_eq!(decision.action, ActionKind::Allow);
    assert_eq!(decision.score, 0.0);
}

#[tokio::test]
async fn an_unmatched_host_falls_back_to_the_default_vhost() {
    let cache = Arc::new(LocalCache::new());
    let mut snapshot = CacheSnapshot::default();
    snapshot.vhosts.insert(DEFAULT_VHOST_ID.to_string(), vhost());
    snapshot.version = 1;
    cache.swap(snapshot);
    let cache_snapshot = cache.snapshot();

    let match_result = matcher::resolve(&cache_snapshot, "unknown.invalid", "/nowhere", "GET");
    assert_eq!(match_result.vhost_id, DEFAULT_VHOST_ID);
}
