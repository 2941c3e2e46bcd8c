//! GitHub provider.
//!
//! Combines the user profile and repository list with per-repository
//! commit and language data for the most recently updated non-fork
//! repositories. Contributions are counted from those commits over a
//! 30-day window, and streaks are computed from the daily counts.
//!
//! A failing per-repository call is logged and skipped; only the profile
//! and repository list are required.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};

use taskflow_core::analysis::{compute_streaks, daily_counts, first_max};
use taskflow_core::models::{
    GitHubCommit, GitHubStats, LanguageUsage, RepoSummary, HISTORY_CAP, RECENT_ITEMS_CAP,
};
use taskflow_core::{DataOrigin, Provider, ProviderStats};

use crate::config::GitHubConfig;
use crate::error::Result;
use crate::http::{endpoint, HttpClient};
use crate::normalize::{clamp_u32, first_line};
use crate::traits::{require_identity, StatsProvider};

/// Days covered by the contribution calendar.
pub const CONTRIBUTION_WINDOW_DAYS: u32 = 30;

const COMMIT_MESSAGE_CHARS: usize = 120;

pub struct GitHubProvider {
    http: HttpClient,
    config: GitHubConfig,
}

impl GitHubProvider {
    pub fn new(http: HttpClient, config: GitHubConfig) -> Self {
        Self { http, config }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Accept", "application/vnd.github+json".to_string())];
        if let Some(token) = self.config.token() {
            headers.push(("Authorization", format!("Bearer {}", token)));
        }
        headers
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = endpoint(&self.config.base_url, segments)?;
        let owned = self.headers();
        let headers: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.http.get_json(url, query, &headers).await
    }

    async fn repo_details(&self, repo: &Repo, author: &str) -> RepoDetails {
        let Some((owner, name)) = repo.full_name.split_once('/') else {
            warn!(repo = %repo.full_name, "unexpected repository name");
            return RepoDetails::default();
        };

        let commit_query = [("author", author), ("per_page", "30")];
        let commits_path = ["repos", owner, name, "commits"];
        let languages_path = ["repos", owner, name, "languages"];
        let (commits, languages) = tokio::join!(
            self.get::<Vec<CommitEntry>>(&commits_path, &commit_query),
            self.get::<HashMap<String, u64>>(&languages_path, &[]),
        );

        let commits = commits.unwrap_or_else(|e| {
            warn!(repo = %repo.full_name, error = %e, "skipping commits");
            Vec::new()
        });
        let languages = languages.unwrap_or_else(|e| {
            warn!(repo = %repo.full_name, error = %e, "skipping languages");
            HashMap::new()
        });

        RepoDetails {
            commits: commits
                .into_iter()
                .filter_map(|c| c.into_commit(&repo.name))
                .collect(),
            languages,
        }
    }
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    public_repos: i64,
    #[serde(default)]
    followers: i64,
    #[serde(default)]
    following: i64,
}

#[derive(Debug, Deserialize)]
struct Repo {
    name: String,
    full_name: String,
    #[serde(default)]
    stargazers_count: i64,
    #[serde(default)]
    forks_count: i64,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl Repo {
    fn summary(&self) -> RepoSummary {
        RepoSummary {
            name: self.name.clone(),
            full_name: self.full_name.clone(),
            stars: clamp_u32(self.stargazers_count),
            forks: clamp_u32(self.forks_count),
            language: self.language.clone(),
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    sha: String,
    #[serde(default)]
    html_url: Option<String>,
    commit: CommitBody,
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    author: Option<CommitAuthor>,
    #[serde(default)]
    committer: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    date: Option<DateTime<Utc>>,
}

impl CommitEntry {
    fn into_commit(self, repo: &str) -> Option<GitHubCommit> {
        let committed_at = self
            .commit
            .author
            .and_then(|a| a.date)
            .or_else(|| self.commit.committer.and_then(|c| c.date))?;
        Some(GitHubCommit {
            sha: self.sha,
            repo: repo.to_string(),
            message: first_line(&self.commit.message, COMMIT_MESSAGE_CHARS),
            committed_at,
            url: self.html_url,
        })
    }
}

#[derive(Debug, Default)]
struct RepoDetails {
    commits: Vec<GitHubCommit>,
    languages: HashMap<String, u64>,
}

#[async_trait]
impl StatsProvider for GitHubProvider {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    fn description(&self) -> &str {
        "GitHub profile, repositories, languages, commits, and streaks"
    }

    // Profile and repositories, then per-repository details
    fn round_trips(&self) -> u32 {
        2
    }

    async fn fetch_stats(&self, identity: &str) -> Result<ProviderStats> {
        let username = require_identity(identity)?;

        let repo_query = [("per_page", "100"), ("sort", "updated")];
        let user_path = ["users", username];
        let repos_path = ["users", username, "repos"];
        let (user, repos) = tokio::try_join!(
            self.get::<User>(&user_path, &[]),
            self.get::<Vec<Repo>>(&repos_path, &repo_query),
        )?;

        let active: Vec<&Repo> = repos
            .iter()
            .filter(|r| !r.fork)
            .take(self.config.max_repos)
            .collect();
        debug!(user = %user.login, repos = repos.len(), sampled = active.len(), "github repositories");

        let details = join_all(active.iter().map(|r| self.repo_details(r, username))).await;

        Ok(ProviderStats::GitHub(normalize(user, &repos, details, Utc::now())))
    }
}

fn normalize(
    user: User,
    repos: &[Repo],
    details: Vec<RepoDetails>,
    now: DateTime<Utc>,
) -> GitHubStats {
    let mut language_bytes: HashMap<String, u64> = HashMap::new();
    let mut commits: Vec<GitHubCommit> = Vec::new();
    for d in details {
        for (lang, bytes) in d.languages {
            *language_bytes.entry(lang).or_default() += bytes;
        }
        commits.extend(d.commits);
    }

    let mut top_languages: Vec<LanguageUsage> = language_bytes
        .into_iter()
        .map(|(language, bytes)| LanguageUsage { language, bytes })
        .collect();
    top_languages.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.language.cmp(&b.language)));
    top_languages.truncate(RECENT_ITEMS_CAP);

    let contributions = daily_counts(
        commits.iter().map(|c| c.committed_at),
        now.date_naive(),
        CONTRIBUTION_WINDOW_DAYS,
    );
    let counts: Vec<u32> = contributions.iter().map(|d| d.count).collect();
    let streaks = compute_streaks(&counts);

    commits.sort_by(|a, b| b.committed_at.cmp(&a.committed_at));
    commits.truncate(HISTORY_CAP);

    GitHubStats {
        username: user.login,
        name: user.name,
        public_repos: clamp_u32(user.public_repos),
        followers: clamp_u32(user.followers),
        following: clamp_u32(user.following),
        total_stars: repos.iter().map(|r| clamp_u32(r.stargazers_count)).sum(),
        total_forks: repos.iter().map(|r| clamp_u32(r.forks_count)).sum(),
        top_languages,
        most_starred_repo: first_max(repos.iter(), |r| r.stargazers_count).map(Repo::summary),
        recent_commits: commits,
        contributions,
        current_streak: streaks.current,
        longest_streak: streaks.longest,
        origin: DataOrigin::Live,
    }
}
