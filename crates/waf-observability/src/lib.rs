//! Ambient observability: structured logging init and the `/metrics` +
//! `/healthz` operational HTTP surface. Distinct from the spec's own
//! cross-instance `metrics:global` aggregation (see `waf-coordination`).

mod error;
mod logging;
mod metrics;
mod server;

pub use error::Error;
pub use logging::init as init_logging;
pub use metrics::WafMetrics;
pub use server::{router, serve, WarmupProbe};
