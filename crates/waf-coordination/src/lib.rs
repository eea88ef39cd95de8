//! Distributed Coordination Layer (spec §4.8 Instance Coordinator, §4.9
//! Metrics Aggregator and Field Learner): instance registration, leader
//! election, leader-only cluster maintenance, and cross-instance metric
//! fan-in, all driven off a shared [`waf_core::store::ConfigStoreClient`].

mod coordinator;
mod error;
mod field_learner;
mod heartbeat;
mod instance_id;
mod leader;
mod metrics;

pub use coordinator::InstanceCoordinator;
pub use error::Error;
pub use field_learner::FieldLearner;
pub use metrics::MetricsCollector;
