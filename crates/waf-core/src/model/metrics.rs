//! Per-endpoint metrics counters (spec §3, §4.9).

use serde::{Deserialize, Serialize};

/// Identifies one endpoint's counter bucket; also used as the hash field
/// name in the store's per-instance metrics hash (spec §4.9).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointMetricsKey {
    pub vhost_id: String,
    pub endpoint_id: String,
}

impl EndpointMetricsKey {
    pub fn field_name(&self) -> String {
        format!("{}:{}", self.vhost_id, self.endpoint_id)
    }
}

/// Counters accumulated per endpoint and fanned in across instances
/// (spec §4.9).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricsCounters {
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub monitored_requests: u64,
    pub allowed_requests: u64,
    pub skipped_requests: u64,
    pub form_submissions: u64,
    pub validation_errors: u64,
    pub spam_score_sum: f64,
}

impl MetricsCounters {
    pub fn merge(&mut self, other: &Self) {
        self.total_requests += other.total_requests;
        self.blocked_requests += other.blocked_requests;
        self.monitored_requests += other.monitored_requests;
        self.allowed_requests += other.allowed_requests;
        self.skipped_requests += other.skipped_requests;
        self.form_submissions += other.form_submissions;
        self.validation_errors += other.validation_errors;
        self.spam_score_sum += other.spam_score_sum;
    }
}
