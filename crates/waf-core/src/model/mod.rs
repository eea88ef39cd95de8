//! Data model entities (spec §3).
//!
//! Every entity here is a plain data record — per §9's design note, the
//! inheritance chain across global/vhost/endpoint layers is *computed* by
//! [`crate::resolver`], never modeled as a type hierarchy.

mod attack_signature;
mod defense_profile;
mod endpoint;
mod fingerprint;
mod global;
mod instance;
mod metrics;
mod vhost;

pub use attack_signature::{AttackSignature, ScoredPattern, SignatureSection};
pub use defense_profile::{DefenseProfile, ProfileSettings};
pub use endpoint::{
    AggregationPolicy, DecisionAggregation, DefenseLine, Endpoint, MatchClause, MethodSet, Mode,
    ProfileRef, ScoreAggregation,
};
pub use fingerprint::{
    ConditionVerb, FingerprintCondition, FingerprintHeaderSelection, FingerprintMatch,
    FingerprintProfile, FpAction, MatchMode, RateLimitConfig,
};
pub use global::{GeoIpConfig, GlobalConfig, ReputationConfig, RoutingConfig, ThresholdsConfig,
    TimingConfig, WebhooksConfig};
pub use instance::{InstanceRecord, InstanceStatus};
pub use metrics::{EndpointMetricsKey, MetricsCounters};
pub use vhost::{HostPatternClass, VirtualHost, DEFAULT_VHOST_ID};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps every mutable entity carries (spec §3 "metadata timestamps").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

/// Merge helper: child-wins for `Option` scalars — `None` means "inherit"
/// (spec §4.2 "Scalars and booleans: child-wins if present; nil means
/// inherit").
pub fn merge_scalar<T: Clone>(parent: &Option<T>, child: &Option<T>) -> Option<T> {
    child.clone().or_else(|| parent.clone())
}

/// Merge helper for list-typed fields: replaced wholesale when the child
/// provides a value, never concatenated across layers (spec §4.2).
pub fn merge_list<T: Clone>(parent: &Option<Vec<T>>, child: &Option<Vec<T>>) -> Option<Vec<T>> {
    match child {
        Some(v) => Some(v.clone()),
        None => parent.clone(),
    }
}
