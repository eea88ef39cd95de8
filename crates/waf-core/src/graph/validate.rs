//! Graph validation: single-start, acyclicity, dangling edges, operator
//! input existence, threshold range non-overlap (spec §4.4 "Validation").

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;

use crate::error::ValidationIssue;

use super::{Graph, NodeSpec, OperatorKind};

pub fn validate(graph: &Graph) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if !graph.nodes.contains_key(&graph.start) {
        issues.push(ValidationIssue::new(
            "graph.start",
            format!("start node '{}' does not exist", graph.start),
        ));
        return issues;
    }

    check_dangling_edges(graph, &mut issues);
    check_operator_inputs(graph, &mut issues);
    check_threshold_ranges(graph, &mut issues);
    check_acyclic(graph, &mut issues);
    check_reachability(graph, &mut issues);

    issues
}

fn check_dangling_edges(graph: &Graph, issues: &mut Vec<ValidationIssue>) {
    for node in graph.nodes.values() {
        for (label, target) in &node.outputs {
            if !graph.nodes.contains_key(target) {
                issues.push(ValidationIssue::new(
                    format!("graph.nodes['{}'].outputs['{}']", node.id, label),
                    format!("target node '{target}' does not exist"),
                ));
            }
        }
    }
}

fn check_operator_inputs(graph: &Graph, issues: &mut Vec<ValidationIssue>) {
    for node in graph.nodes.values() {
        if let NodeSpec::Operator { inputs, .. } = &node.spec {
            for input in inputs {
                if !graph.nodes.contains_key(input) {
                    issues.push(ValidationIssue::new(
                        format!("graph.nodes['{}'].inputs", node.id),
                        format!("input node '{input}' does not exist"),
                    ));
                }
            }
        }
    }
}

fn check_threshold_ranges(graph: &Graph, issues: &mut Vec<ValidationIssue>) {
    for node in graph.nodes.values() {
        if let NodeSpec::Operator {
            operator: OperatorKind::ThresholdBranch { ranges },
            ..
        } = &node.spec
        {
            let mut sorted = ranges.clone();
            sorted.sort_by(|a, b| a.min.partial_cmp(&b.min).unwrap_or(std::cmp::Ordering::Equal));
            for pair in sorted.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let a_max = a.max.unwrap_or(f64::INFINITY);
                if a_max > b.min {
                    issues.push(ValidationIssue::new(
                        format!("graph.nodes['{}'].ranges", node.id),
                        format!(
                            "overlapping threshold ranges [{}, {:?}) and [{}, {:?})",
                            a.min, a.max, b.min, b.max
                        ),
                    ));
                }
            }
        }
    }
}

/// Build a `petgraph` view of the node/edge set, dangling edges already
/// dropped by `check_dangling_edges` so they don't need re-checking here.
fn build_digraph(graph: &Graph) -> DiGraphMap<&str, ()> {
    let mut dg = DiGraphMap::new();
    for id in graph.nodes.keys() {
        dg.add_node(id.as_str());
    }
    for node in graph.nodes.values() {
        for target in node.outputs.values() {
            if graph.nodes.contains_key(target) {
                dg.add_edge(node.id.as_str(), target.as_str(), ());
            }
        }
    }
    dg
}

/// Acyclicity via topological sort (spec §4.4 "Validation").
fn check_acyclic(graph: &Graph, issues: &mut Vec<ValidationIssue>) {
    let dg = build_digraph(graph);
    if let Err(cycle) = toposort(&dg, None) {
        issues.push(ValidationIssue::new(
            "graph",
            format!("cycle detected involving node '{}'", cycle.node_id()),
        ));
    }
}

fn check_reachability(graph: &Graph, issues: &mut Vec<ValidationIssue>) {
    let dg = build_digraph(graph);
    if !dg.contains_node(graph.start.as_str()) {
        return;
    }
    let mut reached: HashSet<&str> = HashSet::new();
    let mut dfs = Dfs::new(&dg, graph.start.as_str());
    while let Some(id) = dfs.next(&dg) {
        reached.insert(id);
    }
    for id in graph.nodes.keys() {
        if !reached.contains(id.as_str()) {
            issues.push(ValidationIssue::new(
                format!("graph.nodes['{id}']"),
                "unreachable from start".to_string(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, OperatorKind};
    use crate::request::ActionKind;
    use std::collections::HashMap;

    fn action_node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            spec: NodeSpec::Action {
                action: ActionKind::Allow,
                reason: None,
                delay_seconds: None,
                provider: None,
            },
            outputs: HashMap::new(),
        }
    }

    #[test]
    fn single_node_graph_is_valid() {
        let mut nodes = HashMap::new();
        nodes.insert("start".to_string(), action_node("start"));
        let graph = Graph {
            start: "start".to_string(),
            nodes,
        };
        assert!(validate(&graph).is_empty());
    }

    #[test]
    fn missing_start_is_rejected() {
        let graph = Graph {
            start: "missing".to_string(),
            nodes: HashMap::new(),
        };
        assert!(!validate(&graph).is_empty());
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let mut start = action_node("start");
        start.outputs.insert("continue".to_string(), "nowhere".to_string());
        let mut nodes = HashMap::new();
        nodes.insert("start".to_string(), start);
        let graph = Graph {
            start: "start".to_string(),
            nodes,
        };
        assert!(!validate(&graph).is_empty());
    }

    #[test]
    fn self_cycle_is_rejected() {
        let mut start = action_node("start");
        start.outputs.insert("continue".to_string(), "start".to_string());
        let mut nodes = HashMap::new();
        nodes.insert("start".to_string(), start);
        let graph = Graph {
            start: "start".to_string(),
            nodes,
        };
        let issues = validate(&graph);
        assert!(issues.iter().any(|i| i.message.contains("cycle")));
    }

    #[test]
    fn overlapping_threshold_ranges_are_rejected() {
        let mut nodes = HashMap::new();
        nodes.insert(
            "branch".to_string(),
            Node {
                id: "branch".to_string(),
                spec: NodeSpec::Operator {
                    operator: OperatorKind::ThresholdBranch {
                        ranges: vec![
                            crate::graph::ThresholdRange {
                                min: 0.0,
                                max: Some(60.0),
                                output: "low".to_string(),
                            },
                            crate::graph::ThresholdRange {
                                min: 50.0,
                                max: None,
                                output: "high".to_string(),
                            },
                        ],
                    },
                    inputs: vec![],
                    config: serde_json::Value::Null,
                },
                outputs: HashMap::new(),
            },
        );
        let graph = Graph {
            start: "branch".to_string(),
            nodes,
        };
        let issues = validate(&graph);
        assert!(issues.iter().any(|i| i.message.contains("overlapping")));
    }
}
