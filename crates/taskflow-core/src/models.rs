//! Core data models shared by the provider clients, the aggregator, and the UI layer.
//!
//! Every per-service record normalizes an upstream payload into unsigned
//! counters plus bounded "recent" lists. Negative upstream values (Reddit
//! karma, downvoted posts) are clamped to zero by the clients before they
//! reach these types, so consumers never see a negative count.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{ActivityAnalysis, SubmissionAnalysis};

/// Maximum number of recent submissions / posts / comments / emails kept per record.
pub const RECENT_ITEMS_CAP: usize = 10;

/// Maximum number of recent commits, activity days, and rating changes kept per record.
pub const HISTORY_CAP: usize = 20;

/// Prefix applied to item ids of synthesized records.
pub const FALLBACK_ID_PREFIX: &str = "fallback_";

/// An external account integration.
///
/// Variant order is the provider priority order used for insights and
/// for iteration over aggregated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    LeetCode,
    Codeforces,
    #[serde(rename = "github")]
    GitHub,
    Reddit,
    Email,
}

impl Provider {
    /// All providers in priority order.
    pub const ALL: [Provider; 5] = [
        Provider::LeetCode,
        Provider::Codeforces,
        Provider::GitHub,
        Provider::Reddit,
        Provider::Email,
    ];

    /// Lowercase identifier used in config keys and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::LeetCode => "leetcode",
            Provider::Codeforces => "codeforces",
            Provider::GitHub => "github",
            Provider::Reddit => "reddit",
            Provider::Email => "email",
        }
    }

    /// Human-readable service name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::LeetCode => "LeetCode",
            Provider::Codeforces => "Codeforces",
            Provider::GitHub => "GitHub",
            Provider::Reddit => "Reddit",
            Provider::Email => "Email",
        }
    }

    /// Parse a provider from its lowercase identifier.
    pub fn parse(s: &str) -> Option<Provider> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Whether a record came from the upstream service or was synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    #[default]
    Live,
    Synthetic,
}

/// Why a configured provider produced no live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidIdentity,
    NotConfigured,
    NotFound,
    UpstreamUnavailable,
    Malformed,
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::InvalidIdentity => "invalid identity",
            FailureKind::NotConfigured => "not configured",
            FailureKind::NotFound => "not found",
            FailureKind::UpstreamUnavailable => "upstream unavailable",
            FailureKind::Malformed => "malformed response",
            FailureKind::Timeout => "timed out",
        };
        f.write_str(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// LeetCode
// ═══════════════════════════════════════════════════════════════════════

/// Submission count for a single calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub date: DateTime<Utc>,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeetCodeStats {
    pub username: String,
    pub total_solved: u32,
    pub total_questions: u32,
    pub easy_solved: u32,
    pub total_easy: u32,
    pub medium_solved: u32,
    pub total_medium: u32,
    pub hard_solved: u32,
    pub total_hard: u32,
    /// Percentage in `0.0..=100.0`.
    pub acceptance_rate: f64,
    /// Global ranking; `0` when unranked.
    pub ranking: u64,
    pub contribution_points: u32,
    pub reputation: u32,
    /// Newest first, capped at [`HISTORY_CAP`].
    pub recent_activity: Vec<DailyActivity>,
    pub origin: DataOrigin,
}

// ═══════════════════════════════════════════════════════════════════════
// Codeforces
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeforcesSubmission {
    pub id: String,
    /// Composite problem key, `"{contestId}-{index}"`.
    pub problem_key: String,
    pub problem_name: String,
    pub problem_rating: Option<u32>,
    pub language: String,
    pub verdict: String,
    pub submitted_at: DateTime<Utc>,
}

impl CodeforcesSubmission {
    pub fn is_accepted(&self) -> bool {
        self.verdict == "OK"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingChange {
    pub contest_id: u64,
    pub contest_name: String,
    pub rank: u32,
    pub old_rating: u32,
    pub new_rating: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeforcesStats {
    pub handle: String,
    pub rating: u32,
    pub max_rating: u32,
    pub rank: String,
    pub max_rank: String,
    pub friend_of_count: u32,
    pub contests_participated: u32,
    pub analysis: SubmissionAnalysis,
    /// Newest first, capped at [`RECENT_ITEMS_CAP`].
    pub recent_submissions: Vec<CodeforcesSubmission>,
    /// Newest first, capped at [`HISTORY_CAP`].
    pub rating_history: Vec<RatingChange>,
    pub origin: DataOrigin,
}

// ═══════════════════════════════════════════════════════════════════════
// GitHub
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    pub stars: u32,
    pub forks: u32,
    pub language: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubCommit {
    pub sha: String,
    pub repo: String,
    pub message: String,
    pub committed_at: DateTime<Utc>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageUsage {
    pub language: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubStats {
    pub username: String,
    pub name: Option<String>,
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,
    pub total_stars: u32,
    pub total_forks: u32,
    /// Descending by bytes, capped at [`RECENT_ITEMS_CAP`].
    pub top_languages: Vec<LanguageUsage>,
    pub most_starred_repo: Option<RepoSummary>,
    /// Newest first, capped at [`HISTORY_CAP`].
    pub recent_commits: Vec<GitHubCommit>,
    /// One entry per day of the contribution window, oldest first.
    pub contributions: Vec<DailyActivity>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub origin: DataOrigin,
}

// ═══════════════════════════════════════════════════════════════════════
// Reddit
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    pub score: u32,
    pub num_comments: u32,
    pub created_at: DateTime<Utc>,
    pub permalink: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedditComment {
    pub id: String,
    pub body: String,
    pub subreddit: String,
    pub score: u32,
    pub created_at: DateTime<Utc>,
    pub link_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedditStats {
    pub username: String,
    pub link_karma: u64,
    pub comment_karma: u64,
    pub total_karma: u64,
    pub account_created: Option<DateTime<Utc>>,
    /// Newest first, capped at [`RECENT_ITEMS_CAP`].
    pub recent_posts: Vec<RedditPost>,
    /// Newest first, capped at [`RECENT_ITEMS_CAP`].
    pub recent_comments: Vec<RedditComment>,
    pub analysis: ActivityAnalysis,
    pub origin: DataOrigin,
}

// ═══════════════════════════════════════════════════════════════════════
// Email
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub snippet: String,
    pub received_at: DateTime<Utc>,
    pub is_unread: bool,
    pub is_important: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStats {
    pub email: String,
    pub total_messages: u64,
    pub total_threads: u64,
    pub unread_count: u32,
    /// Newest first, capped at [`RECENT_ITEMS_CAP`].
    pub recent_emails: Vec<EmailSummary>,
    pub origin: DataOrigin,
}

// ═══════════════════════════════════════════════════════════════════════
// Provider-agnostic wrappers
// ═══════════════════════════════════════════════════════════════════════

/// A normalized stats record from any provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "stats", rename_all = "lowercase")]
pub enum ProviderStats {
    LeetCode(LeetCodeStats),
    Codeforces(CodeforcesStats),
    #[serde(rename = "github")]
    GitHub(GitHubStats),
    Reddit(RedditStats),
    Email(EmailStats),
}

impl ProviderStats {
    pub fn provider(&self) -> Provider {
        match self {
            ProviderStats::LeetCode(_) => Provider::LeetCode,
            ProviderStats::Codeforces(_) => Provider::Codeforces,
            ProviderStats::GitHub(_) => Provider::GitHub,
            ProviderStats::Reddit(_) => Provider::Reddit,
            ProviderStats::Email(_) => Provider::Email,
        }
    }

    pub fn origin(&self) -> DataOrigin {
        match self {
            ProviderStats::LeetCode(s) => s.origin,
            ProviderStats::Codeforces(s) => s.origin,
            ProviderStats::GitHub(s) => s.origin,
            ProviderStats::Reddit(s) => s.origin,
            ProviderStats::Email(s) => s.origin,
        }
    }
}

/// Merged result of one fan-out over all configured providers.
///
/// A provider that is absent from both the stats fields and `failures` was
/// never configured. A provider present in `failures` was configured but
/// did not produce live data (it may still have a synthetic record when a
/// fallback source is enabled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedServicesData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leetcode: Option<LeetCodeStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codeforces: Option<CodeforcesStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reddit: Option<RedditStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailStats>,
    pub last_updated: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<Provider, FailureKind>,
}

impl AggregatedServicesData {
    /// An empty aggregate stamped at `now`.
    pub fn empty(now: DateTime<Utc>, update_interval: Duration) -> Self {
        Self {
            leetcode: None,
            codeforces: None,
            github: None,
            reddit: None,
            email: None,
            last_updated: now,
            next_update: now + update_interval,
            failures: BTreeMap::new(),
        }
    }

    /// Store a record under its provider key, replacing any previous one.
    pub fn insert(&mut self, stats: ProviderStats) {
        match stats {
            ProviderStats::LeetCode(s) => self.leetcode = Some(s),
            ProviderStats::Codeforces(s) => self.codeforces = Some(s),
            ProviderStats::GitHub(s) => self.github = Some(s),
            ProviderStats::Reddit(s) => self.reddit = Some(s),
            ProviderStats::Email(s) => self.email = Some(s),
        }
    }

    pub fn contains(&self, provider: Provider) -> bool {
        match provider {
            Provider::LeetCode => self.leetcode.is_some(),
            Provider::Codeforces => self.codeforces.is_some(),
            Provider::GitHub => self.github.is_some(),
            Provider::Reddit => self.reddit.is_some(),
            Provider::Email => self.email.is_some(),
        }
    }

    /// Providers with a record, in priority order.
    pub fn connected(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.contains(*p))
            .collect()
    }
}

/// Derived summary of the last 24 hours of cross-provider activity.
///
/// Recomputed from [`AggregatedServicesData`] on every request; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDigest {
    pub title: String,
    pub summary: String,
    pub highlights: Vec<String>,
    pub action_items: Vec<String>,
}

/// The account identities to fetch, one optional value per provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentities {
    #[serde(default)]
    pub leetcode: Option<String>,
    #[serde(default)]
    pub codeforces: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub reddit: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ServiceIdentities {
    pub fn get(&self, provider: Provider) -> Option<&str> {
        let value = match provider {
            Provider::LeetCode => &self.leetcode,
            Provider::Codeforces => &self.codeforces,
            Provider::GitHub => &self.github,
            Provider::Reddit => &self.reddit,
            Provider::Email => &self.email,
        };
        value.as_deref()
    }

    /// Providers with an identity supplied, in priority order.
    ///
    /// Blank identities still count as supplied; the provider client rejects them.
    pub fn configured(&self) -> Vec<(Provider, &str)> {
        Provider::ALL
            .into_iter()
            .filter_map(|p| self.get(p).map(|id| (p, id)))
            .collect()
    }
}
