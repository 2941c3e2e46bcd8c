//! Derived metrics over raw provider activity.
//!
//! Everything here is a pure function of its inputs. Providers call these
//! while normalizing upstream payloads; the fallback source calls them on
//! synthetic items so both paths produce identically shaped records.
//!
//! # Tie-breaking
//!
//! "Most popular" selection is a linear scan that keeps the *first* item
//! attaining the maximum score in input order. `Iterator::max_by_key`
//! returns the last maximum, so it is deliberately not used.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CodeforcesSubmission, DailyActivity, RedditComment, RedditPost};

/// Width of a problem-rating histogram bucket.
pub const RATING_BUCKET_WIDTH: u32 = 100;

/// Summary of a list of competitive-programming submissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAnalysis {
    /// Distinct problems with at least one accepted submission.
    pub problems_solved: u32,
    pub total_submissions: u32,
    pub accepted_submissions: u32,
    /// Accepted / total as a percentage; `0.0` when there are no submissions.
    pub acceptance_rate: f64,
    /// Solved problems per rating bucket (lower bound of the bucket).
    pub rating_distribution: BTreeMap<u32, u32>,
    /// Submissions per programming language.
    pub language_distribution: BTreeMap<String, u32>,
}

impl SubmissionAnalysis {
    /// The most used language; ties resolve to the alphabetically first name.
    pub fn favorite_language(&self) -> Option<&str> {
        first_max(self.language_distribution.iter(), |(_, count)| **count)
            .map(|(lang, _)| lang.as_str())
    }
}

/// Summary of a user's posts and comments on a community site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityAnalysis {
    pub total_posts: u32,
    pub total_comments: u32,
    /// Posts plus comments per community.
    pub subreddit_distribution: BTreeMap<String, u32>,
    pub most_popular_post: Option<RedditPost>,
    pub average_post_score: f64,
}

impl ActivityAnalysis {
    /// The community with the most posts and comments; ties resolve alphabetically.
    pub fn most_active_subreddit(&self) -> Option<&str> {
        first_max(self.subreddit_distribution.iter(), |(_, count)| **count)
            .map(|(name, _)| name.as_str())
    }
}

/// Current and longest runs of consecutive active days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Return the first item with the greatest key, in iteration order.
pub fn first_max<I, T, K, F>(items: I, mut key: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    K: PartialOrd,
    F: FnMut(&T) -> K,
{
    let mut best: Option<(K, T)> = None;
    for item in items {
        let k = key(&item);
        let replace = match &best {
            Some((best_k, _)) => k > *best_k,
            None => true,
        };
        if replace {
            best = Some((k, item));
        }
    }
    best.map(|(_, item)| item)
}

/// Histogram bucket for a problem rating (`1450` → `1400`).
pub fn rating_bucket(rating: u32) -> u32 {
    rating / RATING_BUCKET_WIDTH * RATING_BUCKET_WIDTH
}

/// Analyze a list of submissions.
///
/// Distinct-solved counting keys on [`CodeforcesSubmission::problem_key`], so
/// repeated accepted submissions for one problem count once. The rating
/// histogram counts each solved problem once, in the bucket of its rating;
/// unrated problems are left out of the histogram.
pub fn analyze_submissions(submissions: &[CodeforcesSubmission]) -> SubmissionAnalysis {
    let mut solved: HashSet<&str> = HashSet::new();
    let mut rating_distribution = BTreeMap::new();
    let mut language_distribution: BTreeMap<String, u32> = BTreeMap::new();
    let mut accepted = 0u32;

    for sub in submissions {
        *language_distribution.entry(sub.language.clone()).or_default() += 1;

        if !sub.is_accepted() {
            continue;
        }
        accepted += 1;
        if solved.insert(sub.problem_key.as_str()) {
            if let Some(rating) = sub.problem_rating {
                *rating_distribution.entry(rating_bucket(rating)).or_default() += 1;
            }
        }
    }

    let total = submissions.len() as u32;
    SubmissionAnalysis {
        problems_solved: solved.len() as u32,
        total_submissions: total,
        accepted_submissions: accepted,
        acceptance_rate: percentage(accepted, total),
        rating_distribution,
        language_distribution,
    }
}

/// Analyze posts and comments.
///
/// The most popular post is the first post in input order with the highest score.
pub fn analyze_activity(posts: &[RedditPost], comments: &[RedditComment]) -> ActivityAnalysis {
    let mut subreddit_distribution: BTreeMap<String, u32> = BTreeMap::new();
    for post in posts {
        *subreddit_distribution
            .entry(post.subreddit.clone())
            .or_default() += 1;
    }
    for comment in comments {
        *subreddit_distribution
            .entry(comment.subreddit.clone())
            .or_default() += 1;
    }

    let average_post_score = if posts.is_empty() {
        0.0
    } else {
        posts.iter().map(|p| p.score as f64).sum::<f64>() / posts.len() as f64
    };

    ActivityAnalysis {
        total_posts: posts.len() as u32,
        total_comments: comments.len() as u32,
        subreddit_distribution,
        most_popular_post: most_popular_post(posts).cloned(),
        average_post_score,
    }
}

/// The first post attaining the maximum score.
pub fn most_popular_post(posts: &[RedditPost]) -> Option<&RedditPost> {
    first_max(posts.iter(), |p| p.score)
}

/// Compute contribution streaks from per-day counts ordered oldest → newest.
///
/// Single backward pass starting at the most recent day. A zero day resets
/// the running streak. A zero on the most recent day closes the current
/// streak at `0`; otherwise the current streak keeps growing with the
/// running streak as the scan moves back through the window.
///
/// ```rust
/// use taskflow_core::analysis::compute_streaks;
///
/// let s = compute_streaks(&[0, 1, 1, 0, 2]);
/// assert_eq!((s.current, s.longest), (2, 2));
/// ```
pub fn compute_streaks(counts: &[u32]) -> Streaks {
    let mut streaks = Streaks::default();
    let mut running = 0u32;
    let mut current_open = true;

    for (days_back, &count) in counts.iter().rev().enumerate() {
        if count > 0 {
            running += 1;
            streaks.longest = streaks.longest.max(running);
            if current_open {
                streaks.current = streaks.current.max(running);
            }
        } else {
            if days_back == 0 {
                current_open = false;
            }
            running = 0;
        }
    }

    streaks
}

/// Bucket timestamps into one entry per UTC day over the `days` days ending at `today`.
///
/// The result is ordered oldest first and always has exactly `days` entries.
/// Timestamps outside the window are ignored.
pub fn daily_counts(
    timestamps: impl IntoIterator<Item = DateTime<Utc>>,
    today: NaiveDate,
    days: u32,
) -> Vec<DailyActivity> {
    if days == 0 {
        return Vec::new();
    }
    let start = today - Duration::days(i64::from(days) - 1);
    let mut counts = vec![0u32; days as usize];

    for ts in timestamps {
        let day = ts.date_naive();
        if day < start || day > today {
            continue;
        }
        let offset = (day - start).num_days() as usize;
        counts[offset] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| DailyActivity {
            date: (start + Duration::days(i as i64))
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .unwrap_or_default(),
            count,
        })
        .collect()
}

/// `part / whole` as a percentage rounded to two decimals; `0.0` when `whole` is zero.
pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 10_000.0 / whole as f64).round() / 100.0
}

/// Whether `ts` falls within the 24 hours before `now`.
pub fn is_within_last_day(ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let age = now - ts;
    age >= Duration::zero() && age < Duration::hours(24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sub(key: &str, verdict: &str, rating: Option<u32>, lang: &str) -> CodeforcesSubmission {
        CodeforcesSubmission {
            id: format!("{}-{}", key, verdict),
            problem_key: key.to_string(),
            problem_name: format!("Problem {}", key),
            problem_rating: rating,
            language: lang.to_string(),
            verdict: verdict.to_string(),
            submitted_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn post(id: &str, subreddit: &str, score: u32) -> RedditPost {
        RedditPost {
            id: id.to_string(),
            title: format!("Post {}", id),
            subreddit: subreddit.to_string(),
            score,
            num_comments: 0,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            permalink: format!("/r/{}/{}", subreddit, id),
        }
    }

    #[test]
    fn test_streaks_example() {
        let s = compute_streaks(&[0, 1, 1, 0, 2]);
        assert_eq!(s, Streaks { current: 2, longest: 2 });
    }

    #[test]
    fn test_streaks_zero_today_closes_current() {
        let s = compute_streaks(&[1, 1, 1, 0]);
        assert_eq!(s.current, 0);
        assert_eq!(s.longest, 3);
    }

    #[test]
    fn test_streaks_unbroken() {
        let s = compute_streaks(&[3, 1, 4, 1, 5]);
        assert_eq!(s, Streaks { current: 5, longest: 5 });
    }

    #[test]
    fn test_streaks_empty_and_all_zero() {
        assert_eq!(compute_streaks(&[]), Streaks::default());
        assert_eq!(compute_streaks(&[0, 0, 0]), Streaks::default());
    }

    #[test]
    fn test_most_popular_first_max_wins() {
        let posts = vec![
            post("a", "rust", 5),
            post("b", "rust", 9),
            post("c", "golang", 9),
            post("d", "rust", 3),
        ];
        let best = most_popular_post(&posts).unwrap();
        assert_eq!(best.id, "b");
    }

    #[test]
    fn test_most_popular_empty() {
        assert!(most_popular_post(&[]).is_none());
    }

    #[test]
    fn test_analyze_submissions_distinct_solved() {
        let subs = vec![
            sub("1-A", "OK", Some(800), "Rust"),
            sub("1-A", "OK", Some(800), "Rust"),
            sub("1-B", "WRONG_ANSWER", Some(1200), "C++"),
            sub("1-B", "OK", Some(1250), "C++"),
            sub("2-C", "OK", None, "Rust"),
        ];
        let a = analyze_submissions(&subs);
        assert_eq!(a.problems_solved, 3);
        assert_eq!(a.total_submissions, 5);
        assert_eq!(a.accepted_submissions, 4);
        assert_eq!(a.acceptance_rate, 80.0);
        assert_eq!(a.rating_distribution.get(&800), Some(&1));
        assert_eq!(a.rating_distribution.get(&1200), Some(&1));
        assert_eq!(a.language_distribution.get("Rust"), Some(&3));
        assert_eq!(a.favorite_language(), Some("Rust"));
    }

    #[test]
    fn test_analyze_submissions_empty() {
        let a = analyze_submissions(&[]);
        assert_eq!(a.problems_solved, 0);
        assert_eq!(a.acceptance_rate, 0.0);
        assert_eq!(a.favorite_language(), None);
    }

    #[test]
    fn test_analyze_activity() {
        let posts = vec![post("a", "rust", 4), post("b", "golang", 10)];
        let comments = vec![RedditComment {
            id: "c1".into(),
            body: "nice".into(),
            subreddit: "rust".into(),
            score: 2,
            created_at: Utc::now(),
            link_title: None,
        }];
        let a = analyze_activity(&posts, &comments);
        assert_eq!(a.total_posts, 2);
        assert_eq!(a.total_comments, 1);
        assert_eq!(a.subreddit_distribution.get("rust"), Some(&2));
        assert_eq!(a.most_active_subreddit(), Some("rust"));
        assert_eq!(a.average_post_score, 7.0);
        assert_eq!(a.most_popular_post.unwrap().id, "b");
    }

    #[test]
    fn test_rating_bucket() {
        assert_eq!(rating_bucket(800), 800);
        assert_eq!(rating_bucket(1499), 1400);
        assert_eq!(rating_bucket(0), 0);
    }

    #[test]
    fn test_daily_counts_window() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let ts = vec![
            Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 8, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap(),
        ];
        let days = daily_counts(ts, today, 3);
        let counts: Vec<u32> = days.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![1, 0, 2]);
        assert_eq!(days[2].date.date_naive(), today);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn test_within_last_day_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        assert!(is_within_last_day(now, now));
        assert!(is_within_last_day(now - Duration::hours(23), now));
        assert!(!is_within_last_day(now - Duration::hours(24), now));
        assert!(!is_within_last_day(now + Duration::hours(1), now));
    }
}
