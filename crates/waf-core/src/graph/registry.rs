//! Defense/observation node handler registry (spec §4.3).
//!
//! Mirrors the teacher framework's module-discovery registry: handlers are
//! named, registered once at startup, and looked up by name at execution
//! time rather than matched on a hardcoded enum — new defense node kinds
//! can be added without touching the executor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::request::RequestContext;

/// Outcome of evaluating a defense or observation node (spec §4.3:
/// `{outcome_label, score_delta, flags, details}`).
#[derive(Debug, Clone)]
pub struct HandlerOutput {
    pub outcome_label: String,
    pub score_delta: f64,
    pub flags: Vec<String>,
    pub details: serde_json::Value,
}

impl HandlerOutput {
    pub fn new(outcome_label: impl Into<String>) -> Self {
        Self {
            outcome_label: outcome_label.into(),
            score_delta: 0.0,
            flags: vec![],
            details: serde_json::Value::Null,
        }
    }
}

/// A defense or observation node's evaluation logic. Implementations must
/// be pure over `ctx` and `config` (spec §4.3: "must be pure over its
/// inputs ... must not write configuration").
pub trait NodeHandler: Send + Sync {
    fn evaluate(&self, ctx: &RequestContext, config: &serde_json::Value) -> HandlerOutput;
}

/// Name-indexed handler lookup, built once at startup and shared behind an
/// `Arc` across requests.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn NodeHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn NodeHandler>> {
        self.handlers.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysContinue;

    impl NodeHandler for AlwaysContinue {
        fn evaluate(&self, _ctx: &RequestContext, _config: &serde_json::Value) -> HandlerOutput {
            HandlerOutput::new("continue")
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = NodeRegistry::new();
        registry.register("noop", Arc::new(AlwaysContinue));
        assert!(registry.get("noop").is_some());
        assert!(registry.get("missing").is_none());
    }
}
