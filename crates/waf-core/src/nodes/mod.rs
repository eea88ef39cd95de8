//! Built-in defense/observation node handlers (spec §4.3 "expanded").
//!
//! The node registry is populated once at startup; every handler here
//! closes over an `Arc<LocalCache>` rather than receiving cache state
//! through `evaluate`'s `config` argument, the same pattern the
//! coordination layer uses for its shared accumulators. Reading an
//! immutable snapshot through an `Arc` keeps handlers pure over a given
//! cache generation even though the generation itself changes underneath
//! them between requests.

mod field_presence;
mod honeypot_timing;
mod ip_reputation;
mod keyword_filter;
mod provider;
mod rate_limiter;

pub use field_presence::FieldPresenceHandler;
pub use honeypot_timing::HoneypotTimingHandler;
pub use ip_reputation::{IpReputationHandler, ReputationProvider, ReputationVerdict};
pub use keyword_filter::KeywordFilterHandler;
pub use provider::ProviderBackedNode;
pub use rate_limiter::RateLimiterHandler;

use std::sync::Arc;

use crate::cache::LocalCache;
use crate::graph::NodeRegistry;

/// Names the five built-in node kinds are registered under, matching the
/// `kind` a signature section's key must agree with (spec §4.5: "Section
/// name matches a defense-node `kind`").
pub mod kind {
    pub const KEYWORD_FILTER: &str = "keyword_filter";
    pub const RATE_LIMITER: &str = "rate_limiter";
    pub const IP_REPUTATION: &str = "ip_reputation";
    pub const FIELD_PRESENCE: &str = "field_presence";
    pub const HONEYPOT_TIMING: &str = "honeypot_timing";
}

/// Register the five built-in node kinds against `cache`. Callers (the
/// gateway, or `waf-cli`'s simulate command) register any
/// `ProviderBackedNode` adapters for pattern-classifier/CAPTCHA/GeoIP
/// separately, since those need provider-specific wiring this crate
/// doesn't own (spec §4.3 "out of scope per §1").
pub fn register_builtins(registry: &mut NodeRegistry, cache: Arc<LocalCache>) {
    registry.register(kind::KEYWORD_FILTER, Arc::new(KeywordFilterHandler::new(cache.clone())));
    registry.register(kind::RATE_LIMITER, Arc::new(RateLimiterHandler::new(cache.clone())));
    registry.register(kind::IP_REPUTATION, Arc::new(IpReputationHandler::new(cache.clone(), None)));
    registry.register(kind::FIELD_PRESENCE, Arc::new(FieldPresenceHandler));
    registry.register(kind::HONEYPOT_TIMING, Arc::new(HoneypotTimingHandler));
}
