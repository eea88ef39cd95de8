//! Multi-Profile Orchestrator (spec §4.6).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::CacheSnapshot;
use crate::error::Error;
use crate::graph::{self, NodeRegistry};
use crate::model::{AggregationPolicy, DecisionAggregation, DefenseLine, ProfileRef, ScoreAggregation};
use crate::request::{ActionKind, Decision, RequestContext};
use crate::signature_merge::merge_signatures;

/// One profile's decision plus the weight its `ProfileRef` carried, used
/// for `WEIGHTED_AVG` score aggregation (spec §4.6).
struct WeightedDecision {
    decision: Decision,
    weight: f64,
}

/// Run every base profile reference concurrently, aggregate, then layer
/// defense lines on top (spec §4.6).
pub async fn orchestrate(
    cache: &CacheSnapshot,
    registry: &NodeRegistry,
    ctx: &RequestContext,
    profiles: &[ProfileRef],
    aggregation: &AggregationPolicy,
    defense_lines: &[DefenseLine],
) -> Decision {
    let base = run_profiles(cache, registry, ctx, profiles, aggregation).await;
    let mut aggregated = aggregate(&base, aggregation);

    for line in defense_lines {
        if let Some(line_decision) = run_defense_line(cache, registry, ctx, line).await {
            if line_decision.action.is_blocking() {
                aggregated = line_decision;
            } else {
                aggregated.score = combine_scores(aggregated.score, line_decision.score, aggregation.score);
                aggregated.flags.extend(line_decision.flags);
            }
        }
    }

    aggregated
}

async fn run_profiles(
    cache: &CacheSnapshot,
    registry: &NodeRegistry,
    ctx: &RequestContext,
    profiles: &[ProfileRef],
    aggregation: &AggregationPolicy,
) -> Vec<WeightedDecision> {
    let parent_cancel = CancellationToken::new();
    let mut handles = Vec::with_capacity(profiles.len());

    for profile_ref in profiles {
        let Some(profile) = cache.defense_profiles.get(&profile_ref.profile_id) else {
            tracing::warn!(profile_id = %profile_ref.profile_id, "referenced defense profile missing from cache");
            continue;
        };
        let profile = profile.clone();
        let weight = profile_ref.weight;
        let ctx = ctx.clone();
        let registry = registry.clone();
        let child_cancel = parent_cancel.child_token();
        let short_circuit = aggregation.short_circuit && aggregation.decision == DecisionAggregation::Or;
        let parent_cancel = parent_cancel.clone();

        handles.push(tokio::spawn(async move {
            let outcome = match graph::validated(&profile.graph) {
                Ok(validated) => {
                    graph::execute(&validated, &ctx, &registry, &profile.settings, &child_cancel, None).await
                }
                Err(_issues) => graph::ExecutionOutcome {
                    decision: Decision {
                        action: profile.settings.default_action,
                        score: 0.0,
                        flags: vec!["invalid_graph".to_string()],
                        reason: Some("invalid_graph".to_string()),
                        tarpit_delay_seconds: None,
                        provider: None,
                    },
                    fell_back: true,
                },
            };

            if short_circuit && outcome.decision.action.is_blocking() {
                parent_cancel.cancel();
            }

            WeightedDecision {
                decision: outcome.decision,
                weight,
            }
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        if let Ok(weighted) = handle.await {
            results.push(weighted);
        }
    }
    results
}

async fn run_defense_line(
    cache: &CacheSnapshot,
    registry: &NodeRegistry,
    ctx: &RequestContext,
    line: &DefenseLine,
) -> Option<Decision> {
    let profile = cache.defense_profiles.get(&line.profile_id)?;
    let signatures: Vec<_> = line
        .signature_ids
        .iter()
        .filter_map(|id| cache.attack_signatures.get(id))
        .collect();

    // Merge failures degrade to running the profile unmerged rather than
    // dropping the line.
    let overlay = match merge_signatures(&signatures) {
        Ok(overlay) => Some(overlay),
        Err(err) => {
            tracing::warn!(profile_id = %line.profile_id, error = %err, "signature merge failed for defense line");
            None
        }
    };

    let cancel = CancellationToken::new();
    let outcome = match graph::validated(&profile.graph) {
        Ok(validated) => {
            graph::execute(&validated, ctx, registry, &profile.settings, &cancel, overlay.as_ref()).await
        }
        Err(_) => return None,
    };
    Some(outcome.decision)
}

fn aggregate(decisions: &[WeightedDecision], policy: &AggregationPolicy) -> Decision {
    if decisions.is_empty() {
        return Decision::allow();
    }

    let blocked_count = decisions.iter().filter(|d| d.decision.action.is_blocking()).count();
    let is_blocked = match policy.decision {
        DecisionAggregation::Or => blocked_count > 0,
        DecisionAggregation::And => blocked_count == decisions.len(),
        DecisionAggregation::Majority => blocked_count * 2 > decisions.len(),
    };

    let score = match policy.score {
        ScoreAggregation::Sum => decisions.iter().map(|d| d.decision.score).sum(),
        ScoreAggregation::Max => decisions
            .iter()
            .map(|d| d.decision.score)
            .fold(f64::NEG_INFINITY, f64::max),
        ScoreAggregation::WeightedAvg => weighted_avg(decisions),
    };

    let mut flags: Vec<String> = decisions.iter().flat_map(|d| d.decision.flags.clone()).collect();
    flags.sort();
    flags.dedup();

    if is_blocked {
        decisions
            .iter()
            .map(|d| &d.decision)
            .find(|d| d.action.is_blocking())
            .cloned()
            .map(|mut d| {
                d.score = score;
                d.flags = flags;
                d
            })
            .unwrap_or_else(Decision::allow)
    } else {
        Decision {
            action: ActionKind::Allow,
            score,
            flags,
            reason: None,
            tarpit_delay_seconds: None,
            provider: None,
        }
    }
}

fn weighted_avg(decisions: &[WeightedDecision]) -> f64 {
    let total_weight: f64 = decisions.iter().map(|d| d.weight).sum();
    if total_weight == 0.0 {
        return decisions
            .iter()
            .map(|d| d.decision.score)
            .fold(f64::NEG_INFINITY, f64::max);
    }
    decisions.iter().map(|d| d.decision.score * d.weight).sum::<f64>() / total_weight
}

fn combine_scores(a: f64, b: f64, policy: ScoreAggregation) -> f64 {
    match policy {
        ScoreAggregation::Sum => a + b,
        ScoreAggregation::Max => a.max(b),
        ScoreAggregation::WeightedAvg => (a + b) / 2.0,
    }
}

/// Surface the chain from a [`graph::ExecutionOutcome`] as an orchestrator
/// [`Error`] when callers need the distinction (admin-surface dry-run).
pub fn outcome_error(outcome: &graph::ExecutionOutcome) -> Option<Error> {
    if outcome.fell_back {
        Some(Error::BudgetExceeded {
            profile_id: String::new(),
            kind: crate::error::BudgetKind::Hard,
        })
    } else {
        None
    }
}
