//! Mirror discovery: probe dated candidates concurrently and cache the newest
//! one that answers.

pub mod cache;
pub mod candidates;
pub mod probe;

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::DiscoveryConfig;
use crate::stats::DiscoveryStats;
use cache::MirrorCache;
use probe::ProbeOutcome;

/// Finds the most recent reachable mirror. Cheap to clone.
#[derive(Clone)]
pub struct MirrorDiscovery {
    client: reqwest::Client,
    config: DiscoveryConfig,
    cache: MirrorCache,
    stats: DiscoveryStats,
}

impl MirrorDiscovery {
    pub fn new(client: reqwest::Client, config: DiscoveryConfig, stats: DiscoveryStats) -> Self {
        let cache = MirrorCache::from_ttl_secs(config.cache_ttl_secs);
        Self {
            client,
            config,
            cache,
            stats,
        }
    }

    pub fn cache(&self) -> &MirrorCache {
        &self.cache
    }

    /// Return the newest available mirror for today's date window.
    pub async fn find_available(&self) -> Option<String> {
        self.find_available_on(chrono::Local::now().date_naive()).await
    }

    /// Return the newest available mirror for the window ending at `today`.
    ///
    /// A cached mirror short-circuits probing. Otherwise every candidate is
    /// probed concurrently and the first available one in candidate order wins,
    /// regardless of which probe finished first. Only hits are cached.
    pub async fn find_available_on(&self, today: NaiveDate) -> Option<String> {
        if let Some(url) = self.cache.get().await {
            self.stats.inc_cache_hits();
            tracing::debug!(url = %url, "Using cached mirror");
            return Some(url);
        }

        let candidates =
            candidates::candidate_urls(&self.config.url_template, today, self.config.window_days);
        let discovery_id = Uuid::new_v4().to_string();
        let span = redirect_tracing::discovery_span!(&discovery_id, candidates.len());

        async {
            let start = Instant::now();
            let outcomes = self.probe_all(&candidates, &discovery_id).await;

            let available = outcomes.iter().filter(|o| o.is_available()).count() as u64;
            self.stats.inc_discoveries();
            self.stats.add_probes(candidates.len() as u64, available);

            let selected = candidates
                .into_iter()
                .zip(outcomes)
                .find_map(|(url, outcome)| outcome.is_available().then_some(url));

            let current = tracing::Span::current();
            current.record("latency_ms", start.elapsed().as_millis() as u64);

            match &selected {
                Some(url) => {
                    current.record("selected", url.as_str());
                    tracing::info!(url = %url, available, "Mirror discovered");
                    self.cache.store(url.clone()).await;
                }
                None => tracing::warn!("No available mirror in date window"),
            }
            selected
        }
        .instrument(span)
        .await
    }

    /// Probe every candidate at once. Outcomes come back in candidate order.
    async fn probe_all(&self, candidates: &[String], discovery_id: &str) -> Vec<ProbeOutcome> {
        let timeout = Duration::from_secs(self.config.probe_timeout_secs);
        let mut tasks = JoinSet::new();

        for (index, url) in candidates.iter().enumerate() {
            let client = self.client.clone();
            let url = url.clone();
            let span = redirect_tracing::probe_span!(discovery_id, &url);
            tasks.spawn(
                async move { (index, probe::probe(&client, &url, timeout).await) }.instrument(span),
            );
        }

        let mut outcomes = vec![ProbeOutcome::TimedOut; candidates.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = outcome,
                Err(e) => tracing::warn!(error = %e, "Probe task aborted"),
            }
        }
        outcomes
    }
}
