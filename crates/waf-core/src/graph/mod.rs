//! Defense-profile graph: node/edge model, validation, and execution
//! (spec §4.3, §4.4).
//!
//! Mirrors the teacher framework's state-graph pattern: a graph is built,
//! then validated once (DFS coloring) into a [`ValidatedGraph`] wrapper that
//! is the only type the executor accepts — an unvalidated graph cannot be
//! executed, by construction.

mod executor;
mod operator;
mod registry;
mod validate;

pub use executor::{execute, ExecutionOutcome};
pub use operator::{apply_operator, OperatorKind, ThresholdRange};
pub use registry::{HandlerOutput, NodeHandler, NodeRegistry};
pub use validate::validate;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The three node kinds the contract recognizes (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    Defense {
        handler: String,
        config: serde_json::Value,
    },
    Operator {
        operator: OperatorKind,
        inputs: Vec<String>,
        config: serde_json::Value,
    },
    Observation {
        handler: String,
        config: serde_json::Value,
    },
    Action {
        action: crate::request::ActionKind,
        reason: Option<String>,
        delay_seconds: Option<f64>,
        provider: Option<String>,
    },
}

/// One node in a profile's graph: its spec plus its outgoing label→node-id
/// edges (spec §4.3, §4.4 step 4 "Follow `current.outputs[label]`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub spec: NodeSpec,
    pub outputs: HashMap<String, String>,
}

/// A defense profile's DAG: an id-indexed node set plus a designated start
/// (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub start: String,
    pub nodes: HashMap<String, Node>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }
}

/// A graph that has passed [`validate`]. The executor only accepts this
/// type, so an unvalidated graph cannot reach execution (spec §4.4
/// "No execution is permitted if validation fails").
#[derive(Debug, Clone)]
pub struct ValidatedGraph<'g> {
    graph: &'g Graph,
}

impl<'g> ValidatedGraph<'g> {
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }
}

/// Validate `graph` and wrap it for execution, or return the collected
/// validation issues (spec §4.4 "Validation").
pub fn validated(graph: &Graph) -> Result<ValidatedGraph<'_>, Vec<crate::error::ValidationIssue>> {
    let issues = validate(graph);
    if issues.is_empty() {
        Ok(ValidatedGraph { graph })
    } else {
        Err(issues)
    }
}
