//! Fan-out over all configured providers.
//!
//! [`ExternalServicesAggregator::fetch_all_user_data`] calls every provider
//! that has an identity concurrently and waits for all of them. Each call is
//! bounded by the retry budget of one request times the provider's
//! sequential round trips (or a fixed `provider_timeout`). A failure or
//! timeout in one provider never
//! affects the others. Results are merged by provider key, so the outcome
//! does not depend on completion order.
//!
//! ```text
//! ServiceIdentities ──▶ join_all(timeout(fetch_stats)) ──▶ AggregatedServicesData
//!                                  │ Err
//!                                  ▼
//!                         failures[provider] = kind
//!                         (+ synthetic record in demo mode)
//! ```

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use taskflow_core::{
    generate_daily_digest, generate_user_insights, should_update, AggregatedServicesData,
    DailyDigest, Provider, ProviderStats, ServiceIdentities,
};

use crate::config::{AggregatorConfig, Config};
use crate::error::ProviderError;
use crate::fallback::{FallbackDataSource, SyntheticFallback};
use crate::traits::{ProviderRegistry, StatsProvider};

/// Timing knobs for the aggregator.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorSettings {
    /// Spacing between `last_updated` and `next_update`.
    pub update_interval: chrono::Duration,
    /// Worst case for one upstream request including its retries.
    pub request_budget: Duration,
    /// Fixed bound on one provider's `fetch_stats` call, overriding the
    /// budget derived from `request_budget`.
    pub provider_timeout: Option<Duration>,
}

impl AggregatorSettings {
    /// The bound applied to `client.fetch_stats`.
    pub fn timeout_for(&self, client: &dyn StatsProvider) -> Duration {
        self.provider_timeout
            .unwrap_or_else(|| self.request_budget * client.round_trips().max(1))
    }
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self::from(&AggregatorConfig::default())
    }
}

impl From<&AggregatorConfig> for AggregatorSettings {
    fn from(config: &AggregatorConfig) -> Self {
        Self {
            update_interval: config.update_interval(),
            request_budget: config.request_budget(),
            provider_timeout: config.provider_timeout(),
        }
    }
}

pub struct ExternalServicesAggregator {
    registry: ProviderRegistry,
    settings: AggregatorSettings,
    fallback: Option<Box<dyn FallbackDataSource>>,
}

impl ExternalServicesAggregator {
    pub fn new(registry: ProviderRegistry, settings: AggregatorSettings) -> Self {
        Self {
            registry,
            settings,
            fallback: None,
        }
    }

    /// Fill failed providers from `fallback`.
    pub fn with_fallback(mut self, fallback: Box<dyn FallbackDataSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Build the aggregator with every built-in provider. Demo mode attaches
    /// the [`SyntheticFallback`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = ProviderRegistry::from_config(config)?;
        let aggregator = Self::new(registry, AggregatorSettings::from(&config.aggregator));
        if config.aggregator.demo_mode {
            return Ok(aggregator.with_fallback(Box::new(SyntheticFallback)));
        }
        Ok(aggregator)
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub async fn fetch_all_user_data(
        &self,
        identities: &ServiceIdentities,
    ) -> AggregatedServicesData {
        self.fetch_all_user_data_at(identities, Utc::now()).await
    }

    /// [`fetch_all_user_data`](Self::fetch_all_user_data) stamped with an explicit `now`.
    pub async fn fetch_all_user_data_at(
        &self,
        identities: &ServiceIdentities,
        now: DateTime<Utc>,
    ) -> AggregatedServicesData {
        let configured = identities.configured();
        info!(providers = configured.len(), "fetching external services");

        let results = join_all(configured.iter().map(|&(provider, identity)| async move {
            (provider, identity, self.fetch_one(provider, identity).await)
        }))
        .await;

        let mut data = AggregatedServicesData::empty(now, self.settings.update_interval);
        for (provider, identity, result) in results {
            match result {
                Ok(stats) => data.insert(stats),
                Err(e) => {
                    warn!(provider = %provider, error = %e, "provider produced no data");
                    data.failures.insert(provider, e.kind());
                    if let Some(fallback) = &self.fallback {
                        warn!(provider = %provider, "substituting synthetic data");
                        data.insert(fallback.synthesize(provider, identity, now));
                    }
                }
            }
        }

        info!(
            connected = data.connected().len(),
            failed = data.failures.len(),
            "external services fetched"
        );
        data
    }

    async fn fetch_one(
        &self,
        provider: Provider,
        identity: &str,
    ) -> std::result::Result<ProviderStats, ProviderError> {
        let client = self.registry.find(provider).ok_or_else(|| {
            ProviderError::NotConfigured(format!("no client registered for {}", provider))
        })?;

        let bound = self.settings.timeout_for(client);
        match tokio::time::timeout(bound, client.fetch_stats(identity)).await {
            Ok(Ok(stats)) if stats.provider() != provider => Err(ProviderError::Malformed(format!(
                "{} client returned {} stats",
                provider,
                stats.provider()
            ))),
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(bound)),
        }
    }

    pub fn generate_user_insights(&self, data: &AggregatedServicesData) -> Vec<String> {
        generate_user_insights(data)
    }

    pub fn generate_daily_digest(&self, data: &AggregatedServicesData) -> DailyDigest {
        self.generate_daily_digest_at(data, Utc::now())
    }

    pub fn generate_daily_digest_at(
        &self,
        data: &AggregatedServicesData,
        now: DateTime<Utc>,
    ) -> DailyDigest {
        generate_daily_digest(data, now)
    }

    /// Whether data refreshed at `last_updated` is stale.
    pub fn should_update_data(&self, last_updated: DateTime<Utc>) -> bool {
        self.should_update_data_at(last_updated, Utc::now())
    }

    pub fn should_update_data_at(&self, last_updated: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        should_update(last_updated, now, self.settings.update_interval)
    }
}
