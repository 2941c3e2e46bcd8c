//! LeetCode provider.
//!
//! Reads a leetcode-stats style endpoint (`GET {base_url}/{username}`) that
//! returns solved counts per difficulty, ranking, and a submission calendar
//! keyed by unix-seconds strings.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use taskflow_core::models::{DailyActivity, LeetCodeStats, HISTORY_CAP};
use taskflow_core::{DataOrigin, Provider, ProviderStats};

use crate::config::LeetCodeConfig;
use crate::error::{ProviderError, Result};
use crate::http::{endpoint, HttpClient};
use crate::normalize::{clamp_percent, clamp_u32, clamp_u64, from_unix_secs};
use crate::traits::{require_identity, StatsProvider};

pub struct LeetCodeProvider {
    http: HttpClient,
    config: LeetCodeConfig,
}

impl LeetCodeProvider {
    pub fn new(http: HttpClient, config: LeetCodeConfig) -> Self {
        Self { http, config }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct StatsResponse {
    status: String,
    message: Option<String>,
    total_solved: i64,
    total_questions: i64,
    easy_solved: i64,
    total_easy: i64,
    medium_solved: i64,
    total_medium: i64,
    hard_solved: i64,
    total_hard: i64,
    acceptance_rate: f64,
    ranking: i64,
    contribution_points: i64,
    reputation: i64,
    submission_calendar: HashMap<String, i64>,
}

#[async_trait]
impl StatsProvider for LeetCodeProvider {
    fn provider(&self) -> Provider {
        Provider::LeetCode
    }

    fn description(&self) -> &str {
        "LeetCode solved counts, ranking, and submission calendar"
    }

    async fn fetch_stats(&self, identity: &str) -> Result<ProviderStats> {
        let username = require_identity(identity)?;
        let url = endpoint(&self.config.base_url, &[username])?;
        let response: StatsResponse = self.http.get_json(url, &[], &[]).await?;
        normalize(username, response).map(ProviderStats::LeetCode)
    }
}

fn normalize(username: &str, r: StatsResponse) -> Result<LeetCodeStats> {
    if r.status != "success" {
        let message = r.message.unwrap_or_else(|| format!("status '{}'", r.status));
        if message.to_ascii_lowercase().contains("not exist")
            || message.to_ascii_lowercase().contains("not found")
        {
            return Err(ProviderError::NotFound(format!("leetcode user '{}'", username)));
        }
        return Err(ProviderError::UpstreamUnavailable(message));
    }

    Ok(LeetCodeStats {
        username: username.to_string(),
        total_solved: clamp_u32(r.total_solved),
        total_questions: clamp_u32(r.total_questions),
        easy_solved: clamp_u32(r.easy_solved),
        total_easy: clamp_u32(r.total_easy),
        medium_solved: clamp_u32(r.medium_solved),
        total_medium: clamp_u32(r.total_medium),
        hard_solved: clamp_u32(r.hard_solved),
        total_hard: clamp_u32(r.total_hard),
        acceptance_rate: clamp_percent(r.acceptance_rate),
        ranking: clamp_u64(r.ranking),
        contribution_points: clamp_u32(r.contribution_points),
        reputation: clamp_u32(r.reputation),
        recent_activity: calendar_activity(&r.submission_calendar),
        origin: DataOrigin::Live,
    })
}

/// Active days from the submission calendar, newest first.
///
/// Keys that do not parse as unix seconds are skipped.
fn calendar_activity(calendar: &HashMap<String, i64>) -> Vec<DailyActivity> {
    let mut days: Vec<DailyActivity> = calendar
        .iter()
        .filter_map(|(ts, count)| {
            let date = from_unix_secs(ts.trim().parse().ok()?)?;
            let count = clamp_u32(*count);
            (count > 0).then_some(DailyActivity { date, count })
        })
        .collect();
    days.sort_by(|a, b| b.date.cmp(&a.date));
    days.truncate(HISTORY_CAP);
    days
}
