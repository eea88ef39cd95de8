//! Gateway process configuration, sourced entirely from the environment
//! (spec §9 ambient config convention) — no config file, matching the
//! teacher's `websocket_server` binary's env-driven setup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use waf_core::form::FormParseLimits;

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: String,
    pub listen_addr: SocketAddr,
    pub metrics_addr: SocketAddr,
    pub sync_interval: Duration,
    pub form_limits: FormParseLimits,
    /// URL of the external IP reputation feed. Unset disables the
    /// `ip_reputation` node's provider lookup entirely (it falls back to
    /// its whitelist-only behavior).
    pub reputation_feed_url: Option<String>,
    pub reputation_refresh_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let store_url = require_env("WAF_STORE_URL")?;
        let listen_addr = parse_env("WAF_LISTEN_ADDR", "0.0.0.0:8080")?;
        let metrics_addr = parse_env("WAF_METRICS_ADDR", "0.0.0.0:9090")?;
        let sync_interval_secs: u64 = parse_env("WAF_SYNC_INTERVAL_SECS", "30")?;
        let reputation_refresh_secs: u64 = parse_env("WAF_REPUTATION_REFRESH_SECS", "60")?;

        let defaults = FormParseLimits::default();
        let form_limits = FormParseLimits {
            max_body_bytes: parse_env("WAF_MAX_BODY_BYTES", &defaults.max_body_bytes.to_string())?,
            max_multipart_field_bytes: parse_env(
                "WAF_MAX_MULTIPART_FIELD_BYTES",
                &defaults.max_multipart_field_bytes.to_string(),
            )?,
            max_json_depth: parse_env("WAF_MAX_JSON_DEPTH", &defaults.max_json_depth.to_string())?,
        };

        Ok(Self {
            store_url,
            listen_addr,
            metrics_addr,
            sync_interval: Duration::from_secs(sync_interval_secs),
            form_limits,
            reputation_feed_url: std::env::var("WAF_REPUTATION_FEED_URL").ok(),
            reputation_refresh_interval: Duration::from_secs(reputation_refresh_secs),
        })
    }
}

fn require_env(name: &'static str) -> Result<String, Error> {
    std::env::var(name).map_err(|_| Error::MissingEnv(name))
}

fn parse_env<T>(name: &'static str, default: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|e: T::Err| Error::InvalidEnv {
        name,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_url_is_reported_by_name() {
        std::env::remove_var("WAF_STORE_URL");
        let err = require_env("WAF_STORE_URL").unwrap_err();
        assert!(matches!(err, Error::MissingEnv("WAF_STORE_URL")));
    }

    #[test]
    fn falls_back_to_default_when_unset() {
        std::env::remove_var("WAF_LISTEN_ADDR_TEST");
        let addr: SocketAddr = parse_env("WAF_LISTEN_ADDR_TEST", "0.0.0.0:8080").unwrap();
        assert_eq!(addr.port(), 8080);
    }
}
