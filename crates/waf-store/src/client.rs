//! Redis-backed [`ConfigStoreClient`] (spec §6.1).
//!
//! Stores each entity as a JSON string under its `config:<id>` key and
//! maintains a sorted-set index per category for enumeration, matching the
//! key schema verbatim. Uses `ConnectionManager` for auto-reconnect,
//! `redis::pipe()` for batched reads, and `MULTI`/`EXEC` for the
//! multi-step atomic writes the spec calls for (heartbeat, metrics push).

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use waf_core::error::Error as CoreError;
use waf_core::model::{
    AttackSignature, DefenseProfile, Endpoint, FingerprintProfile, GlobalConfig, InstanceRecord,
    MetricsCounters, VirtualHost,
};
use waf_core::store::{ConfigSnapshot, ConfigStoreClient};

use crate::error::Error;
use crate::keys;

pub struct RedisStoreClient {
    connection: ConnectionManager,
}

impl RedisStoreClient {
    pub async fn new(connection_string: &str) -> Result<Self, Error> {
        info!(url = %connection_string, "connecting to redis store");
        let client = redis::Client::open(connection_string).map_err(|e| Error::Connection(e.to_string()))?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }

    async fn read_index<T: serde::de::DeserializeOwned>(
        &self,
        index_key: &str,
        config_key: impl Fn(&str) -> String,
        kind: &'static str,
    ) -> Result<Vec<T>, Error> {
        let mut conn = self.connection.clone();
        let ids: Vec<String> = conn.zrange(index_key, 0, -1).await?;
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.get(config_key(id));
        }
        let raw: Vec<Option<String>> = pipe.query_async(&mut conn).await?;

        let mut entities = Vec::with_capacity(raw.len());
        for (id, body) in ids.iter().zip(raw) {
            let Some(body) = body else { continue };
            match serde_json::from_str::<T>(&body) {
                Ok(entity) => entities.push(entity),
                Err(e) => warn!(kind, id, error = %e, "dropping entity that failed to deserialize"),
            }
        }
        Ok(entities)
    }
}

#[async_trait]
impl ConfigStoreClient for RedisStoreClient {
    async fn read_snapshot(&self) -> Result<ConfigSnapshot, CoreError> {
        self.read_snapshot_inner().await.map_err(Into::into)
    }

    async fn heartbeat(&self, instance_id: &str, now_unix_ms: i64) -> Result<(), CoreError> {
        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set_ex(keys::cluster_instance_heartbeat(instance_id), now_unix_ms, 90)
            .hset(keys::CLUSTER_INSTANCES, instance_id, now_unix_ms);
        pipe.query_async::<()>(&mut conn).await.map_err(Error::from)?;
        Ok(())
    }

    async fn try_acquire_leadership(&self, instance_id: &str, ttl_ms: u64) -> Result<bool, CoreError> {
        let mut conn = self.connection.clone();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(keys::CLUSTER_LEADER)
            .arg(instance_id)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(Error::from)?;
        Ok(acquired.is_some())
    }

    async fn renew_leadership(&self, instance_id: &str, ttl_ms: u64) -> Result<bool, CoreError> {
        let mut conn = self.connection.clone();
        let current: Option<String> = conn.get(keys::CLUSTER_LEADER).await.map_err(Error::from)?;
        if current.as_deref() != Some(instance_id) {
            return Ok(false);
        }
        let _: () = conn
            .pexpire(keys::CLUSTER_LEADER, ttl_ms as i64)
            .await
            .map_err(Error::from)?;
        Ok(true)
    }

    async fn list_instances(&self) -> Result<Vec<InstanceRecord>, CoreError> {
        let mut conn = self.connection.clone();
        let heartbeats: HashMap<String, i64> = conn.hgetall(keys::CLUSTER_INSTANCES).await.map_err(Error::from)?;
        let leader: Option<String> = conn.get(keys::CLUSTER_LEADER).await.map_err(Error::from)?;
        Ok(heartbeats
            .into_iter()
            .map(|(instance_id, last_heartbeat_unix_ms)| InstanceRecord {
                is_leader: leader.as_deref() == Some(instance_id.as_str()),
                instance_id,
                last_heartbeat_unix_ms,
            })
            .collect())
    }

    async fn remove_instance(&self, instance_id: &str) -> Result<(), CoreError> {
        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hdel(keys::CLUSTER_INSTANCES, instance_id)
            .del(keys::cluster_instance_heartbeat(instance_id));
        pipe.query_async::<()>(&mut conn).await.map_err(Error::from)?;
        Ok(())
    }

    async fn push_instance_metrics(
        &self,
        instance_id: &str,
        counters: &HashMap<String, MetricsCounters>,
    ) -> Result<(), CoreError> {
        let mut conn = self.connection.clone();
        let key = keys::metrics_instance(instance_id);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (endpoint_key, values) in counters {
            let body = serde_json::to_string(values).map_err(|e| Error::Serialize {
                kind: "metrics_counters",
                reason: e.to_string(),
            })?;
            pipe.hset(&key, endpoint_key, body);
        }
        pipe.expire(&key, 300);
        pipe.query_async::<()>(&mut conn).await.map_err(Error::from)?;
        Ok(())
    }

    async fn aggregate_global_metrics(&self) -> Result<(), CoreError> {
        let mut conn = self.connection.clone();
        let instance_keys: Vec<String> = conn
            .scan_match(keys::METRICS_INSTANCE_PATTERN)
            .await
            .map_err(Error::from)?
            .collect()
            .await;

        let mut totals: HashMap<String, MetricsCounters> = HashMap::new();
        let mut pipe = redis::pipe();
        for key in &instance_keys {
            pipe.hgetall(key);
        }
        let per_instance: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await.map_err(Error::from)?;

        for fields in per_instance {
            for (endpoint_key, body) in fields {
                if let Ok(parsed) = serde_json::from_str::<MetricsCounters>(&body) {
                    totals.entry(endpoint_key).or_default().merge(&parsed);
                }
            }
        }

        let mut write_pipe = redis::pipe();
        write_pipe.atomic();
        for (endpoint_key, counters) in &totals {
            let body = serde_json::to_string(counters).map_err(|e| Error::Serialize {
                kind: "metrics_counters",
                reason: e.to_string(),
            })?;
            write_pipe.hset(keys::METRICS_GLOBAL, endpoint_key, body);
        }
        write_pipe.hset(keys::METRICS_GLOBAL, "instance_count", instance_keys.len());
        write_pipe.set(keys::METRICS_GLOBAL_UPDATED, chrono::Utc::now().timestamp_millis());
        write_pipe.query_async::<()>(&mut conn).await.map_err(Error::from)?;
        debug!(instances = instance_keys.len(), "fanned in global metrics");
        Ok(())
    }

    async fn learn_fields(&self, vhost_id: &str, endpoint_id: &str, fields: &[String]) -> Result<(), CoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let key = keys::fields_learned(vhost_id, endpoint_id);
        let _: () = conn.sadd(&key, fields).await.map_err(Error::from)?;
        Ok(())
    }
}

impl RedisStoreClient {
    async fn read_snapshot_inner(&self) -> Result<ConfigSnapshot, Error> {
        let mut conn = self.connection.clone();

        let vhosts: Vec<VirtualHost> = self.read_index(keys::VHOSTS_INDEX, keys::vhost_config, "vhost").await?;
        let global_endpoints: Vec<Endpoint> = self
            .read_index(keys::ENDPOINTS_INDEX, keys::endpoint_config, "endpoint")
            .await?;

        let mut vhost_endpoints = Vec::new();
        for vhost in &vhosts {
            let index_key = keys::vhost_endpoints_index(&vhost.id);
            let scoped = self
                .read_index(&index_key, keys::endpoint_config, "vhost_endpoint")
                .await?;
            vhost_endpoints.extend(scoped);
        }

        let defense_profiles: Vec<DefenseProfile> = self
            .read_index(
                keys::DEFENSE_PROFILES_INDEX,
                keys::defense_profile_config,
                "defense_profile",
            )
            .await?;
        let attack_signatures: Vec<AttackSignature> = self
            .read_index(
                keys::ATTACK_SIGNATURES_INDEX,
                keys::attack_signature_config,
                "attack_signature",
            )
            .await?;
        let fingerprint_profiles: Vec<FingerprintProfile> = self
            .read_index(
                keys::FINGERPRINT_PROFILES_INDEX,
                keys::fingerprint_profile_config,
                "fingerprint_profile",
            )
            .await?;

        let blocked_keywords: Vec<String> = conn.smembers(keys::KEYWORDS_BLOCKED).await?;
        let flagged_raw: std::collections::HashSet<String> = conn.smembers(keys::KEYWORDS_FLAGGED).await?;
        let flagged_keywords = flagged_raw
            .into_iter()
            .map(|entry| match entry.rsplit_once(':') {
                Some((word, score)) => (word.to_string(), score.parse().unwrap_or(0.0)),
                None => (entry, 0.0),
            })
            .collect();
        let blocked_hashes: std::collections::HashSet<String> = conn.smembers(keys::HASHES_BLOCKED).await?;
        let whitelist_ips: std::collections::HashSet<String> = conn.smembers(keys::WHITELIST_IPS).await?;

        let mut global_pipe = redis::pipe();
        global_pipe
            .get(keys::CONFIG_THRESHOLDS)
            .get(keys::CONFIG_ROUTING)
            .get(keys::CONFIG_TIMING_TOKEN)
            .get(keys::CONFIG_GEOIP)
            .get(keys::CONFIG_REPUTATION)
            .get(keys::CONFIG_WEBHOOKS);
        let (thresholds_raw, routing_raw, timing_raw, geoip_raw, reputation_raw, webhooks_raw): (
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        ) = global_pipe.query_async(&mut conn).await?;

        fn parse_or_default<T: serde::de::DeserializeOwned + Default>(
            raw: Option<String>,
            kind: &'static str,
        ) -> T {
            raw.and_then(|body| match serde_json::from_str(&body) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(kind, error = %e, "dropping malformed global config section");
                    None
                }
            })
            .unwrap_or_default()
        }

        let global = GlobalConfig {
            thresholds: parse_or_default(thresholds_raw, "thresholds"),
            routing: parse_or_default(routing_raw, "routing"),
            timing: parse_or_default(timing_raw, "timing"),
            geoip: parse_or_default(geoip_raw, "geoip"),
            reputation: parse_or_default(reputation_raw, "reputation"),
            webhooks: parse_or_default(webhooks_raw, "webhooks"),
            mode: Default::default(),
        };

        Ok(ConfigSnapshot {
            vhosts,
            global_endpoints,
            vhost_endpoints,
            defense_profiles,
            attack_signatures,
            fingerprint_profiles,
            blocked_keywords: blocked_keywords.into_iter().collect(),
            flagged_keywords: flagged_keywords.into_iter().collect(),
            blocked_hashes: blocked_hashes.into_iter().collect(),
            whitelist_ips: whitelist_ips.into_iter().collect(),
            global,
        })
    }
}
