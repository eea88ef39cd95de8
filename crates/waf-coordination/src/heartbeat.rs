//! Heartbeat timer (spec §4.8, period H=15s).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use waf_core::store::ConfigStoreClient;

pub const PERIOD: Duration = Duration::from_secs(15);

pub async fn run<S: ConfigStoreClient>(store: Arc<S>, instance_id: String) {
    let mut ticker = tokio::time::interval(PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let now_unix_ms = chrono::Utc::now().timestamp_millis();
        match store.heartbeat(&instance_id, now_unix_ms).await {
            Ok(()) => debug!(instance_id = %instance_id, "heartbeat sent"),
            Err(e) => warn!(instance_id = %instance_id, error = %e, "heartbeat failed"),
        }
    }
}
