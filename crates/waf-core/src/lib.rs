//! Core of a multi-tenant Web Application Firewall for HTTP form
//! submissions: request resolution, defense-profile graph execution,
//! attack-signature merging, and the storage-agnostic contracts the
//! distributed coordination layer (`waf-coordination`) runs against.
//!
//! This crate has no HTTP surface of its own — `waf-gateway` wires the
//! pieces here into an axum service, and `waf-cli` wires them into an
//! offline validation/simulation tool.

pub mod cache;
pub mod error;
pub mod form;
pub mod graph;
pub mod hashing;
pub mod matcher;
pub mod model;
pub mod nodes;
pub mod orchestrator;
pub mod pattern;
pub mod request;
pub mod resolver;
pub mod signature_merge;
pub mod store;
pub mod sync;

#[cfg(feature = "test-support")]
pub mod test_support;

pub use error::{Error, Result};
