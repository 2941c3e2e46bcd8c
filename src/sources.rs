//! `taskflow sources`: which providers are configured and how.

use anyhow::Result;

use taskflow_core::Provider;

use crate::config::Config;
use crate::traits::ProviderRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub provider: Provider,
    pub identity: Option<String>,
    pub base_url: String,
    /// `"-"` for providers without credentials, otherwise whether the
    /// named environment variable is set.
    pub auth: String,
}

impl SourceStatus {
    pub fn status(&self) -> &'static str {
        match (&self.identity, self.auth.as_str()) {
            (None, _) => "NOT CONFIGURED",
            (Some(_), auth) if auth.starts_with("missing") => "NO TOKEN",
            (Some(_), _) => "OK",
        }
    }
}

pub fn source_statuses(config: &Config) -> Vec<SourceStatus> {
    let providers = &config.providers;
    Provider::ALL
        .into_iter()
        .map(|provider| {
            let (base_url, auth) = match provider {
                Provider::LeetCode => (providers.leetcode.base_url.clone(), "-".to_string()),
                Provider::Codeforces => (providers.codeforces.base_url.clone(), "-".to_string()),
                Provider::GitHub => (
                    providers.github.base_url.clone(),
                    token_status(&providers.github.token_env, providers.github.token(), false),
                ),
                Provider::Reddit => (providers.reddit.base_url.clone(), "-".to_string()),
                Provider::Email => (
                    providers.email.base_url.clone(),
                    token_status(
                        &providers.email.access_token_env,
                        providers.email.access_token(),
                        true,
                    ),
                ),
            };
            SourceStatus {
                provider,
                identity: config.identities.get(provider).map(str::to_string),
                base_url,
                auth,
            }
        })
        .collect()
}

fn token_status(var: &str, token: Option<String>, required: bool) -> String {
    match (token, required) {
        (Some(_), _) => format!("${}", var),
        (None, true) => format!("missing ${}", var),
        (None, false) => format!("anonymous (${} unset)", var),
    }
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!(
        "{:<12} {:<16} {:<20} {:<40} AUTH",
        "PROVIDER", "STATUS", "IDENTITY", "BASE URL"
    );
    for s in source_statuses(config) {
        println!(
            "{:<12} {:<16} {:<20} {:<40} {}",
            s.provider.as_str(),
            s.status(),
            s.identity.as_deref().unwrap_or("-"),
            s.base_url,
            s.auth
        );
    }

    let registry = ProviderRegistry::from_config(config)?;
    println!();
    for client in registry.providers() {
        println!("  {:<12} {}", client.provider().as_str(), client.description());
    }

    if config.aggregator.demo_mode {
        println!();
        println!("demo mode: failed providers are filled with synthetic data");
    }
    Ok(())
}
