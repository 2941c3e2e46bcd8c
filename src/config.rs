//! Configuration parsing and validation.
//!
//! TaskFlow is configured with a TOML file (default `config/taskflow.toml`).
//! Every section is optional; a missing section takes its defaults.
//!
//! ```toml
//! [aggregator]
//! update_interval_minutes = 30
//! request_timeout_secs = 10
//! max_retries = 2
//! retry_backoff_ms = 500
//! # provider_timeout_secs = 60
//! demo_mode = false
//!
//! [identities]
//! leetcode = "alice"
//! github = "alice"
//!
//! [providers.github]
//! token_env = "GITHUB_TOKEN"
//! max_repos = 5
//!
//! [drafts]
//! path = "./data/drafts.json"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```
//!
//! Secrets never live in this file. Provider sections name the environment
//! variable that holds a token instead.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use taskflow_core::ServiceIdentities;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub identities: ServiceIdentities,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub drafts: DraftsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregatorConfig {
    #[serde(default = "default_update_interval_minutes")]
    pub update_interval_minutes: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Fixed bound on one provider's whole fetch. Derived from the retry
    /// budget when unset.
    #[serde(default)]
    pub provider_timeout_secs: Option<u64>,
    /// Substitute synthetic records for providers that fail.
    #[serde(default)]
    pub demo_mode: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            update_interval_minutes: default_update_interval_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            provider_timeout_secs: None,
            demo_mode: false,
        }
    }
}

impl AggregatorConfig {
    pub fn update_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.update_interval_minutes))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Worst case for one upstream request: every attempt runs out its
    /// timeout, plus the backoff sleeps between attempts.
    pub fn request_budget(&self) -> Duration {
        let backoff = Duration::from_millis(self.retry_backoff_ms);
        let sleeps: Duration = (1..=self.max_retries)
            .map(|attempt| backoff * (1u32 << (attempt - 1).min(5)))
            .sum();
        self.request_timeout() * (self.max_retries + 1) + sleeps
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_secs.map(Duration::from_secs)
    }
}

fn default_update_interval_minutes() -> u32 {
    30
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub leetcode: LeetCodeConfig,
    #[serde(default)]
    pub codeforces: CodeforcesConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LeetCodeConfig {
    #[serde(default = "default_leetcode_base_url")]
    pub base_url: String,
}

impl Default for LeetCodeConfig {
    fn default() -> Self {
        Self {
            base_url: default_leetcode_base_url(),
        }
    }
}

fn default_leetcode_base_url() -> String {
    "https://leetcode-stats-api.herokuapp.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CodeforcesConfig {
    #[serde(default = "default_codeforces_base_url")]
    pub base_url: String,
}

impl Default for CodeforcesConfig {
    fn default() -> Self {
        Self {
            base_url: default_codeforces_base_url(),
        }
    }
}

fn default_codeforces_base_url() -> String {
    "https://codeforces.com/api".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default = "default_github_base_url")]
    pub base_url: String,
    /// Environment variable holding a personal access token. Requests are
    /// unauthenticated when it is unset.
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    /// How many recently updated repositories to pull commits and languages from.
    #[serde(default = "default_github_max_repos")]
    pub max_repos: usize,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: default_github_base_url(),
            token_env: default_github_token_env(),
            max_repos: default_github_max_repos(),
        }
    }
}

impl GitHubConfig {
    pub fn token(&self) -> Option<String> {
        read_secret(&self.token_env)
    }
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_github_max_repos() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedditConfig {
    #[serde(default = "default_reddit_base_url")]
    pub base_url: String,
    #[serde(default = "default_reddit_user_agent")]
    pub user_agent: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: default_reddit_base_url(),
            user_agent: default_reddit_user_agent(),
        }
    }
}

fn default_reddit_base_url() -> String {
    "https://www.reddit.com".to_string()
}
fn default_reddit_user_agent() -> String {
    format!("taskflow/{} (activity dashboard)", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default = "default_email_base_url")]
    pub base_url: String,
    /// Environment variable holding an OAuth2 access token for the Gmail API.
    #[serde(default = "default_email_access_token_env")]
    pub access_token_env: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            base_url: default_email_base_url(),
            access_token_env: default_email_access_token_env(),
        }
    }
}

impl EmailConfig {
    pub fn access_token(&self) -> Option<String> {
        read_secret(&self.access_token_env)
    }
}

fn default_email_base_url() -> String {
    "https://gmail.googleapis.com/gmail/v1".to_string()
}
fn default_email_access_token_env() -> String {
    "GMAIL_ACCESS_TOKEN".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DraftsConfig {
    /// JSON file backing the draft cache. Drafts live only in memory when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

fn read_secret(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate aggregator
    if config.aggregator.update_interval_minutes < 1 {
        anyhow::bail!("aggregator.update_interval_minutes must be >= 1");
    }
    if config.aggregator.request_timeout_secs < 1 {
        anyhow::bail!("aggregator.request_timeout_secs must be >= 1");
    }
    if config.aggregator.provider_timeout_secs == Some(0) {
        anyhow::bail!("aggregator.provider_timeout_secs must be >= 1");
    }

    // Validate providers
    if !(1..=20).contains(&config.providers.github.max_repos) {
        anyhow::bail!("providers.github.max_repos must be in [1, 20]");
    }
    if config.providers.reddit.user_agent.trim().is_empty() {
        anyhow::bail!("providers.reddit.user_agent must not be empty");
    }

    for (name, base_url) in [
        ("leetcode", &config.providers.leetcode.base_url),
        ("codeforces", &config.providers.codeforces.base_url),
        ("github", &config.providers.github.base_url),
        ("reddit", &config.providers.reddit.base_url),
        ("email", &config.providers.email.base_url),
    ] {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            anyhow::bail!(
                "providers.{}.base_url must be an http(s) URL, got '{}'",
                name,
                base_url
            );
        }
    }

    Ok(config)
}
