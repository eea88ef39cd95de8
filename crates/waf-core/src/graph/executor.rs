//! Single-profile DAG executor (spec §4.4).

use std::collections::HashMap;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::model::ProfileSettings;
use crate::request::{ActionKind, Decision, RequestContext};
use crate::signature_merge::{self, Overlay};

use super::operator::{apply_operator, NodeResult, OperatorOutput};
use super::registry::NodeRegistry;
use super::{NodeSpec, ValidatedGraph};

/// Factor applied to `max_execution_time_ms` to derive the hard abort
/// ceiling (spec §4.4 step 5: "Exceeding a hard ceiling (10x the
/// configured budget) aborts").
const HARD_CEILING_FACTOR: u32 = 10;

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub decision: Decision,
    /// True if the profile's `default_action` was used because of a
    /// dangling edge, budget abort, or defensive cycle trip.
    pub fell_back: bool,
}

struct MutableState {
    score: f64,
    flags: Vec<String>,
    results: HashMap<String, NodeResult>,
    visited: HashMap<String, u32>,
}

/// Traverse `validated` from its start node to a terminal decision
/// (spec §4.4 "Algorithm"). `overlay`, when present, is folded into each
/// defense node's static config before it runs (spec:95, §4.5).
pub async fn execute(
    validated: &ValidatedGraph<'_>,
    ctx: &RequestContext,
    registry: &NodeRegistry,
    settings: &ProfileSettings,
    cancel: &CancellationToken,
    overlay: Option<&Overlay>,
) -> ExecutionOutcome {
    let graph = validated.graph();
    let started = Instant::now();
    let soft_budget = std::time::Duration::from_millis(settings.max_execution_time_ms);
    let hard_budget = soft_budget * HARD_CEILING_FACTOR;

    let mut state = MutableState {
        score: 0.0,
        flags: vec![],
        results: HashMap::new(),
        visited: HashMap::new(),
    };
    let mut current_id = graph.start.clone();

    loop {
        if cancel.is_cancelled() {
            return fallback(settings, state.flags, "cancelled");
        }

        let elapsed = started.elapsed();
        if elapsed >= hard_budget {
            return fallback(settings, state.flags, "timeout");
        }
        if elapsed >= soft_budget {
            state.flags.push("budget_warning".to_string());
        }

        let visits = state.visited.entry(current_id.clone()).or_insert(0);
        *visits += 1;
        if *visits > 1 {
            return fallback(settings, state.flags, "cycle_detected");
        }

        let Some(node) = graph.node(&current_id) else {
            return fallback(settings, state.flags, "dangling_edge");
        };

        let label = match &node.spec {
            NodeSpec::Defense { handler, config } => {
                let merged;
                let effective_config = match overlay.and_then(|o| o.get(handler)) {
                    Some(section) => {
                        merged = signature_merge::apply_overlay(config, section);
                        &merged
                    }
                    None => config,
                };
                let output = match registry.get(handler) {
                    Some(h) => h.evaluate(ctx, effective_config),
                    None => super::registry::HandlerOutput::new("continue"),
                };
                state.score += output.score_delta;
                state.flags.extend(output.flags.clone());
                let blocked = output.outcome_label == "blocked";
                let result = NodeResult {
                    score_delta: output.score_delta,
                    blocked,
                };
                state.results.insert(node.id.clone(), result);
                output.outcome_label
            }
            NodeSpec::Observation { handler, config } => {
                let output = match registry.get(handler) {
                    Some(h) => h.evaluate(ctx, config),
                    None => super::registry::HandlerOutput::new("continue"),
                };
                state.score += output.score_delta;
                state.flags.extend(output.flags.clone());
                let blocked = output.outcome_label == "blocked";
                let result = NodeResult {
                    score_delta: output.score_delta,
                    blocked,
                };
                state.results.insert(node.id.clone(), result);
                output.outcome_label
            }
            NodeSpec::Operator {
                operator, inputs, ..
            } => {
                let resolved: Vec<NodeResult> = inputs
                    .iter()
                    .filter_map(|id| state.results.get(id).copied())
                    .collect();
                match apply_operator(operator, &resolved) {
                    OperatorOutput::Numeric(v) => {
                        let result = NodeResult {
                            score_delta: v,
                            blocked: false,
                        };
                        state.results.insert(node.id.clone(), result);
                        "next".to_string()
                    }
                    OperatorOutput::Boolean(b) => {
                        let result = NodeResult {
                            score_delta: 0.0,
                            blocked: b,
                        };
                        state.results.insert(node.id.clone(), result);
                        "next".to_string()
                    }
                    OperatorOutput::Label(label) => {
                        let result = NodeResult {
                            score_delta: 0.0,
                            blocked: false,
                        };
                        state.results.insert(node.id.clone(), result);
                        label
                    }
                }
            }
            NodeSpec::Action {
                action,
                reason,
                delay_seconds,
                provider,
            } => {
                return ExecutionOutcome {
                    decision: Decision {
                        action: *action,
                        score: state.score,
                        flags: state.flags,
                        reason: reason.clone(),
                        tarpit_delay_seconds: *delay_seconds,
                        provider: provider.clone(),
                    },
                    fell_back: false,
                };
            }
        };

        current_id = match node.outputs.get(&label) {
            Some(next) => next.clone(),
            None => match node.outputs.get("continue") {
                Some(next) => next.clone(),
                None => return fallback(settings, state.flags, "no_matching_output"),
            },
        };
    }
}

fn fallback(settings: &ProfileSettings, mut flags: Vec<String>, reason: &str) -> ExecutionOutcome {
    flags.push(reason.to_string());
    ExecutionOutcome {
        decision: Decision {
            action: settings.default_action,
            score: 0.0,
            flags,
            reason: Some(reason.to_string()),
            tarpit_delay_seconds: None,
            provider: None,
        },
        fell_back: true,
    }
}

/// Convenience: does this outcome's action count as blocking for
/// aggregation purposes (spec §4.6)?
pub fn is_blocking(outcome: &ExecutionOutcome) -> bool {
    outcome.decision.action == ActionKind::Block
        || outcome.decision.action == ActionKind::Tarpit
        || outcome.decision.action == ActionKind::Captcha
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{validated, Graph, Node};
    use crate::model::ProfileSettings;
    use std::collections::HashMap as Map;

    fn settings() -> ProfileSettings {
        ProfileSettings {
            default_action: ActionKind::Allow,
            max_execution_time_ms: 50,
        }
    }

    fn ctx() -> RequestContext {
        RequestContext {
            host: "example.com".into(),
            path: "/submit".into(),
            method: "POST".into(),
            client_ip: "127.0.0.1".into(),
            headers: Map::new(),
            form_fields: Map::new(),
            form_hash: "h".into(),
            submission_fingerprint: "fp".into(),
            vhost_id: "default".into(),
            endpoint_id: "e".into(),
        }
    }

    #[tokio::test]
    async fn single_action_node_resolves_immediately() {
        let mut nodes = Map::new();
        nodes.insert(
            "start".to_string(),
            Node {
                id: "start".to_string(),
                spec: NodeSpec::Action {
                    action: ActionKind::Block,
                    reason: Some("builtin".to_string()),
                    delay_seconds: None,
                    provider: None,
                },
                outputs: Map::new(),
            },
        );
        let graph = Graph {
            start: "start".to_string(),
            nodes,
        };
        let validated = validated(&graph).unwrap();
        let registry = NodeRegistry::new();
        let cancel = CancellationToken::new();
        let outcome = execute(&validated, &ctx(), &registry, &settings(), &cancel, None).await;
        assert_eq!(outcome.decision.action, ActionKind::Block);
        assert!(!outcome.fell_back);
    }

    #[tokio::test]
    async fn dangling_output_falls_back_to_default_action() {
        let mut start = Node {
            id: "start".to_string(),
            spec: NodeSpec::Defense {
                handler: "missing_handler".to_string(),
                config: serde_json::Value::Null,
            },
            outputs: Map::new(),
        };
        start.outputs.insert("continue".to_string(), "gone".to_string());
        let mut nodes = Map::new();
        nodes.insert("start".to_string(), start);
        let graph = Graph {
            start: "start".to_string(),
            nodes,
        };
        let issues = super::super::validate(&graph);
        assert!(!issues.is_empty(), "dangling edge should fail validation");
    }

    #[tokio::test]
    async fn cancellation_falls_back_to_default_action() {
        let mut nodes = Map::new();
        nodes.insert(
            "start".to_string(),
            Node {
                id: "start".to_string(),
                spec: NodeSpec::Action {
                    action: ActionKind::Block,
                    reason: None,
                    delay_seconds: None,
                    provider: None,
                },
                outputs: Map::new(),
            },
        );
        let graph = Graph {
            start: "start".to_string(),
            nodes,
        };
        let validated = validated(&graph).unwrap();
        let registry = NodeRegistry::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = execute(&validated, &ctx(), &registry, &settings(), &cancel, None).await;
        assert_eq!(outcome.decision.action, ActionKind::Allow);
        assert!(outcome.fell_back);
    }

    /// Blocks once the config it receives carries a `ceiling` below 10 —
    /// lets a test assert what the node actually saw after overlay merge.
    struct CeilingProbe;

    impl super::super::registry::NodeHandler for CeilingProbe {
        fn evaluate(&self, _ctx: &RequestContext, config: &serde_json::Value) -> super::super::registry::HandlerOutput {
            let ceiling = config.get("ceiling").and_then(|v| v.as_f64()).unwrap_or(100.0);
            if ceiling < 10.0 {
                super::super::registry::HandlerOutput::new("blocked")
            } else {
                super::super::registry::HandlerOutput::new("continue")
            }
        }
    }

    fn defense_probe_graph() -> Graph {
        let mut probe = Node {
            id: "probe".to_string(),
            spec: NodeSpec::Defense {
                handler: "ceiling_probe".to_string(),
                config: serde_json::json!({ "ceiling": 60 }),
            },
            outputs: Map::new(),
        };
        probe.outputs.insert("blocked".to_string(), "block".to_string());
        probe.outputs.insert("continue".to_string(), "allow".to_string());

        let block = Node {
            id: "block".to_string(),
            spec: NodeSpec::Action {
                action: ActionKind::Block,
                reason: None,
                delay_seconds: None,
                provider: None,
            },
            outputs: Map::new(),
        };
        let allow = Node {
            id: "allow".to_string(),
            spec: NodeSpec::Action {
                action: ActionKind::Allow,
                reason: None,
                delay_seconds: None,
                provider: None,
            },
            outputs: Map::new(),
        };

        let mut nodes = Map::new();
        nodes.insert("probe".to_string(), probe);
        nodes.insert("block".to_string(), block);
        nodes.insert("allow".to_string(), allow);
        Graph {
            start: "probe".to_string(),
            nodes,
        }
    }

    #[tokio::test]
    async fn overlay_ceiling_below_static_config_governs_the_node() {
        let graph = defense_probe_graph();
        let validated = validated(&graph).unwrap();
        let mut registry = NodeRegistry::new();
        registry.register("ceiling_probe", std::sync::Arc::new(CeilingProbe));
        let cancel = CancellationToken::new();

        let mut section = crate::model::SignatureSection::default();
        section.numeric_ceilings.insert("ceiling".to_string(), 5.0);
        let mut overlay = Overlay::new();
        overlay.insert("ceiling_probe".to_string(), section);

        let outcome = execute(&validated, &ctx(), &registry, &settings(), &cancel, Some(&overlay)).await;
        assert_eq!(outcome.decision.action, ActionKind::Block);
    }

    #[tokio::test]
    async fn no_overlay_leaves_the_static_config_untouched() {
        let graph = defense_probe_graph();
        let validated = validated(&graph).unwrap();
        let mut registry = NodeRegistry::new();
        registry.register("ceiling_probe", std::sync::Arc::new(CeilingProbe));
        let cancel = CancellationToken::new();

        let outcome = execute(&validated, &ctx(), &registry, &settings(), &cancel, None).await;
        assert_eq!(outcome.decision.action, ActionKind::Allow);
    }
}
