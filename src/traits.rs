//! The provider extension seam.
//!
//! Each external service is a [`StatsProvider`]. Built-in providers are
//! resolved from the config by [`ProviderRegistry::from_config`]; tests and
//! embedders can [`register`](ProviderRegistry::register) their own.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              ProviderRegistry                │
//! │ ┌────────┐┌──────────┐┌──────┐┌──────┐┌─────┐│
//! │ │LeetCode││Codeforces││GitHub││Reddit││Email││
//! │ └────────┘└──────────┘└──────┘└──────┘└─────┘│
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!        ExternalServicesAggregator::fetch_all_user_data
//! ```
//!
//! # Usage
//!
//! ```rust
//! use taskflow::traits::ProviderRegistry;
//!
//! let mut providers = ProviderRegistry::new();
//! // providers.register(Box::new(MyProvider::new()));
//! assert!(providers.is_empty());
//! ```

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use taskflow_core::{Provider, ProviderStats};

use crate::config::Config;
use crate::error::ProviderError;
use crate::http::HttpClient;

/// A client for one external service.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use taskflow::error::ProviderError;
/// use taskflow::traits::StatsProvider;
/// use taskflow_core::{Provider, ProviderStats};
///
/// pub struct OfflineLeetCode;
///
/// #[async_trait]
/// impl StatsProvider for OfflineLeetCode {
///     fn provider(&self) -> Provider { Provider::LeetCode }
///     fn description(&self) -> &str { "Always unavailable" }
///
///     async fn fetch_stats(&self, _identity: &str) -> Result<ProviderStats, ProviderError> {
///         Err(ProviderError::UpstreamUnavailable("offline".into()))
///     }
/// }
/// ```
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Which service this client talks to.
    fn provider(&self) -> Provider;

    /// One-line description, shown by `taskflow sources`.
    fn description(&self) -> &str;

    /// Upstream requests [`fetch_stats`](StatsProvider::fetch_stats) makes one
    /// after another. Concurrent requests count once.
    fn round_trips(&self) -> u32 {
        1
    }

    /// Fetch and normalize stats for `identity`.
    ///
    /// Blank identities fail with [`ProviderError::InvalidIdentity`] before
    /// any network call.
    async fn fetch_stats(&self, identity: &str) -> Result<ProviderStats, ProviderError>;

    /// [`fetch_stats`](StatsProvider::fetch_stats) with failures logged and
    /// swallowed.
    async fn get_user_stats(&self, identity: &str) -> Option<ProviderStats> {
        match self.fetch_stats(identity).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(provider = %self.provider(), error = %e, "provider fetch failed");
                None
            }
        }
    }
}

/// Trim an identity, rejecting blank input.
pub fn require_identity(identity: &str) -> Result<&str, ProviderError> {
    let trimmed = identity.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::InvalidIdentity);
    }
    Ok(trimmed)
}

/// Registry of provider clients, at most one per [`Provider`].
pub struct ProviderRegistry {
    providers: Vec<Box<dyn StatsProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all five built-in providers configured from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        use crate::provider_codeforces::CodeforcesProvider;
        use crate::provider_email::EmailProvider;
        use crate::provider_github::GitHubProvider;
        use crate::provider_leetcode::LeetCodeProvider;
        use crate::provider_reddit::RedditProvider;

        let http = HttpClient::new(&config.aggregator)?;
        let providers = &config.providers;

        let mut registry = Self::new();
        registry.register(Box::new(LeetCodeProvider::new(
            http.clone(),
            providers.leetcode.clone(),
        )));
        registry.register(Box::new(CodeforcesProvider::new(
            http.clone(),
            providers.codeforces.clone(),
        )));
        registry.register(Box::new(GitHubProvider::new(
            http.clone(),
            providers.github.clone(),
        )));
        registry.register(Box::new(RedditProvider::new(
            http.clone(),
            providers.reddit.clone(),
        )));
        registry.register(Box::new(EmailProvider::new(http, providers.email.clone())));

        Ok(registry)
    }

    /// Register a provider, replacing any existing client for the same service.
    pub fn register(&mut self, provider: Box<dyn StatsProvider>) {
        let kind = provider.provider();
        self.providers.retain(|p| p.provider() != kind);
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Box<dyn StatsProvider>] {
        &self.providers
    }

    pub fn find(&self, provider: Provider) -> Option<&dyn StatsProvider> {
        self.providers
            .iter()
            .find(|p| p.provider() == provider)
            .map(|p| p.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
