//! Codeforces provider.
//!
//! Uses the official REST API. `user.info`, `user.status`, and
//! `user.rating` are requested concurrently; each answers with a
//! `{status, result, comment}` envelope where anything but `"OK"` is a
//! failure. Codeforces sends failed envelopes with a 4xx status, so they
//! are decoded rather than treated as transport errors.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use taskflow_core::analysis::analyze_submissions;
use taskflow_core::models::{
    CodeforcesStats, CodeforcesSubmission, RatingChange, HISTORY_CAP, RECENT_ITEMS_CAP,
};
use taskflow_core::{DataOrigin, Provider, ProviderStats};

use crate::config::CodeforcesConfig;
use crate::error::{ProviderError, Result};
use crate::http::{endpoint, HttpClient};
use crate::normalize::{clamp_u32, from_unix_secs};
use crate::traits::{require_identity, StatsProvider};

/// Submissions requested from `user.status`.
const SUBMISSION_PAGE: &str = "100";

pub struct CodeforcesProvider {
    http: HttpClient,
    config: CodeforcesConfig,
}

impl CodeforcesProvider {
    pub fn new(http: HttpClient, config: CodeforcesConfig) -> Self {
        Self { http, config }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = endpoint(&self.config.base_url, &[method])?;
        let envelope: Envelope<T> = self.http.get_json_envelope(url, query, &[]).await?;
        envelope.into_result(method)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    comment: Option<String>,
    result: Option<T>,
}

impl<T> Envelope<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if self.status != "OK" {
            let comment = self.comment.unwrap_or_else(|| self.status.clone());
            if comment.to_ascii_lowercase().contains("not found") {
                return Err(ProviderError::NotFound(comment));
            }
            return Err(ProviderError::UpstreamUnavailable(format!(
                "{}: {}",
                method, comment
            )));
        }
        self.result
            .ok_or_else(|| ProviderError::Malformed(format!("{}: OK envelope without result", method)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    handle: String,
    #[serde(default)]
    rating: i64,
    #[serde(default)]
    max_rating: i64,
    #[serde(default)]
    rank: Option<String>,
    #[serde(default)]
    max_rank: Option<String>,
    #[serde(default)]
    friend_of_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Submission {
    id: i64,
    creation_time_seconds: i64,
    problem: Problem,
    #[serde(default)]
    programming_language: String,
    /// Absent while the submission is still being judged.
    #[serde(default)]
    verdict: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Problem {
    #[serde(default)]
    contest_id: Option<i64>,
    #[serde(default)]
    problemset_name: Option<String>,
    index: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    rating: Option<i64>,
}

impl Problem {
    fn key(&self) -> String {
        match (&self.contest_id, &self.problemset_name) {
            (Some(contest), _) => format!("{}-{}", contest, self.index),
            (None, Some(set)) => format!("{}-{}", set, self.index),
            (None, None) => format!("{}-{}", self.name, self.index),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingEntry {
    contest_id: i64,
    contest_name: String,
    rank: i64,
    rating_update_time_seconds: i64,
    old_rating: i64,
    new_rating: i64,
}

#[async_trait]
impl StatsProvider for CodeforcesProvider {
    fn provider(&self) -> Provider {
        Provider::Codeforces
    }

    fn description(&self) -> &str {
        "Codeforces rating, rating history, and submission analysis"
    }

    async fn fetch_stats(&self, identity: &str) -> Result<ProviderStats> {
        let handle = require_identity(identity)?;

        let info_query = [("handles", handle)];
        let status_query = [("handle", handle), ("from", "1"), ("count", SUBMISSION_PAGE)];
        let rating_query = [("handle", handle)];

        let (info, submissions, ratings) = tokio::try_join!(
            self.call::<Vec<UserInfo>>("user.info", &info_query),
            self.call::<Vec<Submission>>("user.status", &status_query),
            self.call::<Vec<RatingEntry>>("user.rating", &rating_query),
        )?;

        let user = info
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("codeforces handle '{}'", handle)))?;

        Ok(ProviderStats::Codeforces(normalize(user, submissions, ratings)))
    }
}

fn normalize(
    user: UserInfo,
    submissions: Vec<Submission>,
    ratings: Vec<RatingEntry>,
) -> CodeforcesStats {
    let mut submissions: Vec<CodeforcesSubmission> =
        submissions.into_iter().filter_map(convert_submission).collect();
    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    let analysis = analyze_submissions(&submissions);

    let contests_participated = ratings.len() as u32;
    let mut rating_history: Vec<RatingChange> = ratings
        .into_iter()
        .filter_map(|r| {
            Some(RatingChange {
                contest_id: r.contest_id.max(0) as u64,
                contest_name: r.contest_name,
                rank: clamp_u32(r.rank),
                old_rating: clamp_u32(r.old_rating),
                new_rating: clamp_u32(r.new_rating),
                updated_at: from_unix_secs(r.rating_update_time_seconds)?,
            })
        })
        .collect();
    rating_history.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    rating_history.truncate(HISTORY_CAP);

    submissions.truncate(RECENT_ITEMS_CAP);

    CodeforcesStats {
        handle: user.handle,
        rating: clamp_u32(user.rating),
        max_rating: clamp_u32(user.max_rating),
        rank: user.rank.unwrap_or_else(|| "unrated".to_string()),
        max_rank: user.max_rank.unwrap_or_else(|| "unrated".to_string()),
        friend_of_count: clamp_u32(user.friend_of_count),
        contests_participated,
        analysis,
        recent_submissions: submissions,
        rating_history,
        origin: DataOrigin::Live,
    }
}

fn convert_submission(s: Submission) -> Option<CodeforcesSubmission> {
    Some(CodeforcesSubmission {
        id: s.id.to_string(),
        problem_key: s.problem.key(),
        problem_name: s.problem.name.clone(),
        problem_rating: s.problem.rating.map(clamp_u32),
        language: s.programming_language,
        verdict: s.verdict.unwrap_or_else(|| "TESTING".to_string()),
        submitted_at: from_unix_secs(s.creation_time_seconds)?,
    })
}
