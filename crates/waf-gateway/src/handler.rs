//! The data-plane request handler: `POST /*path` (spec §6.2). Resolves,
//! parses the body, runs the fingerprint pre-check, orchestrates the
//! defense-profile graph, and renders the decision as JSON plus `X-WAF-*`
//! headers (spec §4.4, §4.6).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use waf_core::form::{self, ContentType};
use waf_core::model::{Endpoint, EndpointMetricsKey, FpAction, Mode};
use waf_core::request::{ActionKind, Decision, RequestContext};
use waf_core::{hashing, matcher, orchestrator, resolver};

use crate::fingerprint;
use crate::state::GatewayState;

#[derive(Serialize)]
struct DecisionBody {
    action: ActionKind,
    score: f64,
    flags: Vec<String>,
    vhost_id: String,
    endpoint_id: String,
    client_ip: String,
    form_hash: String,
    fingerprint: String,
}

pub async fn handle(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: axum::body::Bytes,
) -> Response {
    let start = Instant::now();
    let cache = state.cache.snapshot();

    let host = host_header(&headers);
    let path = uri.path().to_string();
    let method_str = method.as_str().to_string();
    let header_map = collect_headers(&headers);
    let client_ip = client_ip(&header_map, peer);

    let match_result = matcher::resolve(&cache, &host, &path, &method_str);
    let endpoint = cache
        .vhost_endpoints
        .get(&match_result.vhost_id)
        .into_iter()
        .flatten()
        .chain(cache.global_endpoints.iter())
        .find(|e| e.id == match_result.endpoint_id)
        .cloned()
        .unwrap_or_else(Endpoint::synthetic_default);

    let effective = resolver::resolve(&cache, &match_result, &endpoint);

    let form_fields = match parse_form(&headers, &body, &state.form_limits) {
        Ok(fields) => fields,
        Err(issues) => {
            warn!(vhost_id = %match_result.vhost_id, endpoint_id = %match_result.endpoint_id, issues = %issues, "form parse failed");
            state.metrics.requests_total.with_label_values(&[&match_result.vhost_id, &match_result.endpoint_id, "validation_error"]).inc();
            state.coordinator.metrics.record(
                EndpointMetricsKey {
                    vhost_id: match_result.vhost_id.clone(),
                    endpoint_id: match_result.endpoint_id.clone(),
                },
                waf_core::model::MetricsCounters {
                    total_requests: 1,
                    validation_errors: 1,
                    ..Default::default()
                },
            );
            let decision = Decision {
                action: ActionKind::Block,
                score: 0.0,
                flags: vec!["validation_error".to_string()],
                reason: Some(issues),
                tarpit_delay_seconds: None,
                provider: None,
            };
            return render(decision, &effective, &match_result, &client_ip, String::new(), String::new());
        }
    };

    let form_hash = hashing::form_hash(&form_fields);
    let selection = fingerprint::select(&cache.fingerprint_profiles, &header_map);
    let submission_fingerprint = hashing::submission_fingerprint(&header_map, &form_fields, &selection.header_selection);

    let ctx = RequestContext {
        host: host.clone(),
        path: path.clone(),
        method: method_str.clone(),
        client_ip: client_ip.clone(),
        headers: header_map,
        form_fields,
        form_hash: form_hash.clone(),
        submission_fingerprint: submission_fingerprint.clone(),
        vhost_id: match_result.vhost_id.clone(),
        endpoint_id: match_result.endpoint_id.clone(),
    };

    state.coordinator.field_learner.maybe_observe(
        &ctx.vhost_id,
        &ctx.endpoint_id,
        ctx.form_fields.keys().cloned(),
    );

    let decision = if let Some(early) = early_fingerprint_decision(&state, &selection, &ctx) {
        early
    } else if effective.skip_waf {
        Decision::allow().with_flag(effective.skip_reason.clone().unwrap_or_default())
    } else {
        orchestrator::orchestrate(
            &cache,
            &state.registry,
            &ctx,
            &effective.defense_profiles,
            &endpoint.aggregation,
            &endpoint.defense_lines,
        )
        .await
    };

    record_metrics(&state, &match_result, &decision, effective.mode, start);

    if let Some(delay) = tarpit_delay(&decision, effective.mode) {
        tokio::time::sleep(delay).await;
    }

    render(decision, &effective, &match_result, &client_ip, form_hash, submission_fingerprint)
}

/// How long to hold a `tarpit` decision open before responding as a block
/// (spec:257 "tarpit waits the configured duration then responds as
/// block"). `None` under `mode: monitoring`, which never enforces a block
/// for the request to wait ahead of.
fn tarpit_delay(decision: &Decision, mode: Mode) -> Option<std::time::Duration> {
    if decision.action != ActionKind::Tarpit || mode == Mode::Monitoring {
        return None;
    }
    decision
        .tarpit_delay_seconds
        .map(|secs| std::time::Duration::from_secs_f64(secs.max(0.0)))
}

/// Fingerprint profiles are evaluated before the graph (spec §3 "an early
/// classifier"); `block`/`allow` short-circuit, `flag` is folded into the
/// profile's decision as a starting point rather than replacing it, and
/// `ignore` contributes nothing but the header selection already consumed.
fn early_fingerprint_decision(
    state: &GatewayState,
    selection: &fingerprint::FingerprintSelection<'_>,
    ctx: &RequestContext,
) -> Option<Decision> {
    let profile = selection.profile?;

    if let Some(limit) = &profile.rate_limit {
        let key = format!("{}:{}", profile.id, ctx.client_ip);
        if !state.fingerprint_limiter.allow(&key, limit.requests_per_minute) {
            return Some(
                Decision {
                    action: ActionKind::Block,
                    score: profile.score,
                    flags: vec![],
                    reason: Some(format!("fingerprint_rate_limited:{}", profile.id)),
                    tarpit_delay_seconds: None,
                    provider: None,
                }
                .with_flag("fingerprint_rate_limited"),
            );
        }
    }

    match profile.action {
        FpAction::Block => Some(
            Decision {
                action: ActionKind::Block,
                score: profile.score,
                flags: vec![],
                reason: Some(format!("fingerprint:{}", profile.id)),
                tarpit_delay_seconds: None,
                provider: None,
            }
            .with_flag(format!("fingerprint:{}", profile.id)),
        ),
        FpAction::Allow => Some(Decision::allow().with_flag(format!("fingerprint:{}", profile.id))),
        FpAction::Flag | FpAction::Ignore => None,
    }
}

fn record_metrics(
    state: &GatewayState,
    match_result: &matcher::MatchResult,
    decision: &Decision,
    mode: Mode,
    start: Instant,
) {
    let action_label = match decision.action {
        ActionKind::Allow => "allow",
        ActionKind::Block => "block",
        ActionKind::Tarpit => "tarpit",
        ActionKind::Captcha => "captcha",
        ActionKind::Flag => "flag",
        ActionKind::Monitor => "monitor",
    };
    state
        .metrics
        .requests_total
        .with_label_values(&[&match_result.vhost_id, &match_result.endpoint_id, action_label])
        .inc();
    state
        .metrics
        .execution_duration_seconds
        .observe(start.elapsed().as_secs_f64());

    let mut counters = waf_core::model::MetricsCounters {
        total_requests: 1,
        form_submissions: 1,
        spam_score_sum: decision.score,
        ..Default::default()
    };
    match (mode, decision.action.is_blocking()) {
        (Mode::Passthrough, _) => counters.skipped_requests = 1,
        (Mode::Monitoring, true) => counters.monitored_requests = 1,
        (_, true) => counters.blocked_requests = 1,
        (_, false) => counters.allowed_requests = 1,
    }

    state.coordinator.metrics.record(
        EndpointMetricsKey {
            vhost_id: match_result.vhost_id.clone(),
            endpoint_id: match_result.endpoint_id.clone(),
        },
        counters,
    );
}

/// Mode `monitoring` suppresses blocking system-wide: the decision, flags,
/// and score are still reported as computed, but a blocking action never
/// produces an HTTP-visible block (spec §4.2 Mode glossary entry).
fn render(
    decision: Decision,
    effective: &resolver::EffectiveConfig,
    match_result: &matcher::MatchResult,
    client_ip: &str,
    form_hash: String,
    submission_fingerprint: String,
) -> Response {
    let really_blocked = decision.action.is_blocking() && effective.mode != Mode::Monitoring;

    let body = DecisionBody {
        action: decision.action,
        score: decision.score,
        flags: decision.flags.clone(),
        vhost_id: match_result.vhost_id.clone(),
        endpoint_id: match_result.endpoint_id.clone(),
        client_ip: client_ip.to_string(),
        form_hash: form_hash.clone(),
        fingerprint: submission_fingerprint.clone(),
    };

    let status = if really_blocked { StatusCode::FORBIDDEN } else { StatusCode::OK };
    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();

    set_header(headers, "x-waf-form-hash", &form_hash);
    set_header(headers, "x-waf-spam-score", &decision.score.to_string());
    set_header(headers, "x-waf-spam-flags", &decision.flags.join(","));
    set_header(headers, "x-waf-client-ip", client_ip);
    set_header(headers, "x-waf-mode", &format!("{:?}", effective.mode).to_lowercase());
    set_header(headers, "x-waf-vhost", &match_result.vhost_id);
    set_header(headers, "x-waf-endpoint", &match_result.endpoint_id);
    set_header(headers, "x-waf-submission-fingerprint", &submission_fingerprint);
    set_header(
        headers,
        "x-waf-rate-limit",
        &effective.routing.rate_limit_value.is_some().to_string(),
    );
    if let Some(value) = effective.routing.rate_limit_value {
        set_header(headers, "x-waf-rate-limit-value", &value.to_string());
    }
    if let Some(value) = effective.thresholds.spam_threshold {
        set_header(headers, "x-waf-spam-threshold", &value.to_string());
    }
    if let Some(value) = effective.thresholds.hash_rate_threshold {
        set_header(headers, "x-waf-hash-rate-threshold", &value.to_string());
    }
    if let Some(value) = effective.thresholds.ip_spam_threshold {
        set_header(headers, "x-waf-ip-spam-threshold", &value.to_string());
    }
    if let Some(value) = effective.thresholds.fingerprint_threshold {
        set_header(headers, "x-waf-fingerprint-threshold", &value.to_string());
    }
    if really_blocked {
        set_header(headers, "x-blocked", "true");
    }

    response
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = axum::http::HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

fn host_header(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn collect_headers(headers: &HeaderMap) -> std::collections::HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

/// Reads `X-Forwarded-For`'s first hop first, matching a reverse-proxied
/// deployment; falls back to the TCP peer address.
fn client_ip(headers: &std::collections::HashMap<String, String>, peer: SocketAddr) -> String {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("x-forwarded-for"))
        .and_then(|(_, v)| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

fn parse_form(
    headers: &HeaderMap,
    body: &[u8],
    limits: &form::FormParseLimits,
) -> Result<std::collections::HashMap<String, String>, String> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match ContentType::from_header(content_type) {
        Some(ContentType::UrlEncoded) => form::parse_urlencoded(body, limits).map_err(|e| e.to_string()),
        Some(ContentType::Multipart) => {
            let boundary = ContentType::multipart_boundary(content_type).unwrap_or_default();
            form::parse_multipart(body, &boundary, limits).map_err(|e| e.to_string())
        }
        Some(ContentType::Json) => form::parse_json(body, limits).map_err(|e| e.to_string()),
        None => Err(format!("unsupported content-type '{content_type}'")),
    }
}
