//! Leader election, renewal, and leader-only maintenance (spec §4.8).
//!
//! A single `cluster:leader` key, set-if-absent with a 30s TTL; the holder
//! renews every 10s. A failed renewal is treated as leadership loss (spec
//! §7) — the next election round is free to hand leadership to any
//! instance still heartbeating, including the one that just lost it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use waf_core::store::ConfigStoreClient;

pub const LEADER_TTL_MS: u64 = 30_000;
pub const ELECTION_PERIOD: Duration = Duration::from_secs(10);
pub const MAINTENANCE_PERIOD: Duration = Duration::from_secs(10);
pub const DRIFT_AFTER_MS: i64 = 60_000;
pub const DOWN_AFTER_MS: i64 = 300_000;

/// Election + renewal loop: every 10s, acquire if not held, else renew.
/// A renewal failure flips `is_leader` false immediately rather than
/// waiting for the key to expire naturally.
pub async fn run_election<S: ConfigStoreClient>(store: Arc<S>, instance_id: String, is_leader: Arc<AtomicBool>) {
    let mut ticker = tokio::time::interval(ELECTION_PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let currently_leader = is_leader.load(Ordering::Acquire);
        let result = if currently_leader {
            store.renew_leadership(&instance_id, LEADER_TTL_MS).await
        } else {
            store.try_acquire_leadership(&instance_id, LEADER_TTL_MS).await
        };

        match result {
            Ok(true) if !currently_leader => {
                info!(instance_id = %instance_id, "acquired cluster leadership");
                is_leader.store(true, Ordering::Release);
            }
            Ok(true) => {}
            Ok(false) if currently_leader => {
                warn!(instance_id = %instance_id, "lost cluster leadership on renewal");
                is_leader.store(false, Ordering::Release);
            }
            Ok(false) => {}
            Err(e) => {
                warn!(instance_id = %instance_id, error = %e, "leader election round failed");
                if currently_leader {
                    is_leader.store(false, Ordering::Release);
                }
            }
        }
    }
}

/// Leader-only maintenance: classify instances by heartbeat age, drop the
/// ones past `DOWN_AFTER_MS`, then run whatever the caller wants done once
/// per round while leadership is held (spec: "runs the metrics aggregation
/// step; invokes any registered leader tasks").
pub async fn run_maintenance<S, F, Fut>(
    store: Arc<S>,
    is_leader: Arc<AtomicBool>,
    mut on_leader_round: F,
) where
    S: ConfigStoreClient,
    F: FnMut(Arc<S>) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(MAINTENANCE_PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if !is_leader.load(Ordering::Acquire) {
            continue;
        }

        // re-check leadership before every leader-only write (spec: the ex-leader
        // must re-verify before writing metrics:global, which carries no TTL)
        if !is_leader.load(Ordering::Acquire) {
            continue;
        }

        let now = chrono::Utc::now().timestamp_millis();
        match store.list_instances().await {
            Ok(instances) => {
                for instance in instances {
                    let status = instance.status(now, DRIFT_AFTER_MS, DOWN_AFTER_MS);
                    match status {
                        waf_core::model::InstanceStatus::Down => {
                            debug!(instance_id = %instance.instance_id, "removing down instance");
                            if let Err(e) = store.remove_instance(&instance.instance_id).await {
                                warn!(instance_id = %instance.instance_id, error = %e, "failed to remove down instance");
                            }
                        }
                        waf_core::model::InstanceStatus::Drifted => {
                            debug!(instance_id = %instance.instance_id, "instance is drifted");
                        }
                        waf_core::model::InstanceStatus::Active => {}
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to list instances for leader maintenance"),
        }

        if is_leader.load(Ordering::Acquire) {
            on_leader_round(store.clone()).await;
        }
    }
}
