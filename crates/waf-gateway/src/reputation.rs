//! HTTP-polled `ReputationProvider` (spec §4.3's pluggable external lookup),
//! wired here rather than in `waf-core` since the trait is deliberately
//! vendor-agnostic there.
//!
//! `check` never makes a network call: it only reads whatever the last
//! background poll populated, matching the trait's synchronous contract.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use serde::Deserialize;
use tracing::warn;

use waf_core::error::Error;
use waf_core::nodes::{ReputationProvider, ReputationVerdict};

#[derive(Debug, Default, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    bad_ips: Vec<String>,
    #[serde(default)]
    suspicious_ips: Vec<String>,
}

/// Polls a JSON reputation feed (`{"bad_ips": [...], "suspicious_ips": [...]}`)
/// on an interval and serves verdicts out of the last poll's result.
pub struct HttpReputationProvider {
    client: reqwest::Client,
    feed_url: String,
    bad: DashSet<String>,
    suspicious: DashSet<String>,
}

impl HttpReputationProvider {
    pub fn new(feed_url: String) -> Arc<Self> {
        Arc::new(Self {
            client: reqwest::Client::new(),
            feed_url,
            bad: DashSet::new(),
            suspicious: DashSet::new(),
        })
    }

    /// Spawn the background poll loop, mirroring the Sync Worker's
    /// fixed-interval shape.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                this.poll_once().await;
            }
        })
    }

    async fn poll_once(&self) {
        let response = match self.client.get(&self.feed_url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, url = %self.feed_url, "reputation feed fetch failed");
                return;
            }
        };

        match response.json::<FeedResponse>().await {
            Ok(feed) => self.replace(feed),
            Err(err) => warn!(error = %err, "reputation feed returned invalid JSON"),
        }
    }

    fn replace(&self, feed: FeedResponse) {
        self.bad.clear();
        self.bad.extend(feed.bad_ips);
        self.suspicious.clear();
        self.suspicious.extend(feed.suspicious_ips);
    }
}

impl ReputationProvider for HttpReputationProvider {
    fn check(&self, client_ip: &str) -> Result<ReputationVerdict, Error> {
        if self.bad.contains(client_ip) {
            Ok(ReputationVerdict::Bad)
        } else if self.suspicious.contains(client_ip) {
            Ok(ReputationVerdict::Suspicious)
        } else {
            Ok(ReputationVerdict::Good)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_ip_is_good() {
        let provider = HttpReputationProvider::new("http://example.invalid/feed".to_string());
        assert_eq!(provider.check("1.2.3.4").unwrap(), ReputationVerdict::Good);
    }

    #[test]
    fn replace_populates_bad_and_suspicious_sets() {
        let provider = HttpReputationProvider::new("http://example.invalid/feed".to_string());
        provider.replace(FeedResponse {
            bad_ips: vec!["1.2.3.4".to_string()],
            suspicious_ips: vec!["5.6.7.8".to_string()],
        });
        assert_eq!(provider.check("1.2.3.4").unwrap(), ReputationVerdict::Bad);
        assert_eq!(provider.check("5.6.7.8").unwrap(), ReputationVerdict::Suspicious);
        assert_eq!(provider.check("9.9.9.9").unwrap(), ReputationVerdict::Good);
    }

    #[test]
    fn replace_drops_entries_missing_from_the_latest_feed() {
        let provider = HttpReputationProvider::new("http://example.invalid/feed".to_string());
        provider.replace(FeedResponse {
            bad_ips: vec!["1.2.3.4".to_string()],
            suspicious_ips: vec![],
        });
        provider.replace(FeedResponse::default());
        assert_eq!(provider.check("1.2.3.4").unwrap(), ReputationVerdict::Good);
    }
}
