//! Operator node behaviors: score/boolean aggregation and threshold
//! branching (spec §4.3).

use serde::{Deserialize, Serialize};

/// A single `{min, max, output}` range in a `threshold_branch` operator
/// (spec §4.3: "the first range with `min <= score < max` selects the
/// output label"; `max: None` means +∞).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub min: f64,
    pub max: Option<f64>,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperatorKind {
    Sum,
    Max,
    Min,
    And,
    Or,
    ThresholdBranch { ranges: Vec<ThresholdRange> },
}

/// Result of evaluating a predecessor node, as the executor caches it
/// (spec §4.4 "executor caches every node's last result").
#[derive(Debug, Clone, Copy)]
pub struct NodeResult {
    pub score_delta: f64,
    /// True iff the node's outcome label counted as "blocked" for this
    /// evaluation (spec §4.3 "`and|or` aggregate booleans").
    pub blocked: bool,
}

/// Output of applying an operator: a numeric value (for `sum|max|min`), a
/// boolean (for `and|or`), or a selected output label (for
/// `threshold_branch`) — always carried on the `next` label per spec §4.3,
/// except `threshold_branch` which selects its own label.
pub enum OperatorOutput {
    Numeric(f64),
    Boolean(bool),
    Label(String),
}

/// Apply `operator` to the named inputs' cached results (spec §4.3).
pub fn apply_operator(operator: &OperatorKind, inputs: &[NodeResult]) -> OperatorOutput {
    match operator {
        OperatorKind::Sum => {
            OperatorOutput::Numeric(inputs.iter().map(|r| r.score_delta).sum())
        }
        OperatorKind::Max => OperatorOutput::Numeric(
            inputs
                .iter()
                .map(|r| r.score_delta)
                .fold(f64::NEG_INFINITY, f64::max),
        ),
        OperatorKind::Min => OperatorOutput::Numeric(
            inputs
                .iter()
                .map(|r| r.score_delta)
                .fold(f64::INFINITY, f64::min),
        ),
        OperatorKind::And => OperatorOutput::Boolean(inputs.iter().all(|r| r.blocked)),
        OperatorKind::Or => OperatorOutput::Boolean(inputs.iter().any(|r| r.blocked)),
        OperatorKind::ThresholdBranch { ranges } => {
            let score = inputs.first().map(|r| r.score_delta).unwrap_or(0.0);
            let label = ranges
                .iter()
                .find(|r| score >= r.min && score < r.max.unwrap_or(f64::INFINITY))
                .map(|r| r.output.clone())
                .unwrap_or_else(|| "continue".to_string());
            OperatorOutput::Label(label)
        }
    }
}
