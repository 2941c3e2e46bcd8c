//! Cross-provider insights, the daily digest, and the staleness check.
//!
//! All functions are pure over [`AggregatedServicesData`] plus an explicit
//! `now`, so the same input and clock reading always give the same output.

use chrono::{DateTime, Duration, Utc};

use crate::analysis::is_within_last_day;
use crate::models::{AggregatedServicesData, DailyDigest};

/// Rankings at or below this value are worth mentioning.
pub const NOTABLE_RANKING: u64 = 100_000;

/// Acceptance rate (percent) at which LeetCode accuracy is praised.
pub const STRONG_ACCEPTANCE_RATE: f64 = 60.0;

/// Longest streak (days) at which the streak record is mentioned.
pub const NOTABLE_STREAK_DAYS: u32 = 7;

/// Unread email count above which inbox triage is suggested.
pub const UNREAD_EMAIL_THRESHOLD: u32 = 10;

/// Whether data last refreshed at `last_updated` is due for a refresh.
///
/// Exactly `update_interval` elapsed counts as due.
pub fn should_update(
    last_updated: DateTime<Utc>,
    now: DateTime<Utc>,
    update_interval: Duration,
) -> bool {
    now - last_updated >= update_interval
}

/// Produce human-readable insight sentences.
///
/// Ordered by provider priority (LeetCode, Codeforces, GitHub, Reddit,
/// Email); each sentence is emitted only when its threshold is met.
pub fn generate_user_insights(data: &AggregatedServicesData) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(lc) = &data.leetcode {
        if lc.total_solved > 0 {
            insights.push(format!(
                "You've solved {} LeetCode problems ({} easy, {} medium, {} hard).",
                lc.total_solved, lc.easy_solved, lc.medium_solved, lc.hard_solved
            ));
        }
        if lc.ranking > 0 && lc.ranking <= NOTABLE_RANKING {
            insights.push(format!(
                "Your LeetCode global ranking is #{}.",
                lc.ranking
            ));
        }
        if lc.acceptance_rate >= STRONG_ACCEPTANCE_RATE {
            insights.push(format!(
                "Your LeetCode acceptance rate of {:.1}% is excellent.",
                lc.acceptance_rate
            ));
        }
    }

    if let Some(cf) = &data.codeforces {
        if cf.rating > 0 {
            insights.push(format!(
                "Your Codeforces rating is {} ({}).",
                cf.rating, cf.rank
            ));
        }
        if cf.max_rating > cf.rating {
            insights.push(format!(
                "You are {} points below your peak Codeforces rating of {}.",
                cf.max_rating - cf.rating,
                cf.max_rating
            ));
        }
        if cf.analysis.problems_solved > 0 {
            insights.push(format!(
                "You've solved {} Codeforces problems with a {:.1}% acceptance rate.",
                cf.analysis.problems_solved, cf.analysis.acceptance_rate
            ));
        }
        if let Some(lang) = cf.analysis.favorite_language() {
            insights.push(format!("Your most-used Codeforces language is {}.", lang));
        }
    }

    if let Some(gh) = &data.github {
        insights.push(format!(
            "You have {} public GitHub repositories with {} total stars.",
            gh.public_repos, gh.total_stars
        ));
        if gh.current_streak > 0 {
            insights.push(format!(
                "You're on a {}-day GitHub contribution streak!",
                gh.current_streak
            ));
        }
        if gh.longest_streak >= NOTABLE_STREAK_DAYS {
            insights.push(format!(
                "Your longest GitHub contribution streak is {} days.",
                gh.longest_streak
            ));
        }
        if let Some(top) = gh.top_languages.first() {
            insights.push(format!("Your top GitHub language is {}.", top.language));
        }
    }

    if let Some(rd) = &data.reddit {
        insights.push(format!("You have {} Reddit karma.", rd.total_karma));
        if let Some(sub) = rd.analysis.most_active_subreddit() {
            insights.push(format!("Your most active subreddit is r/{}.", sub));
        }
    }

    if let Some(em) = &data.email {
        if em.unread_count > 0 {
            insights.push(format!("You have {} unread emails.", em.unread_count));
        }
    }

    insights
}

/// Summarize the last 24 hours of activity and the follow-ups it suggests.
pub fn generate_daily_digest(data: &AggregatedServicesData, now: DateTime<Utc>) -> DailyDigest {
    let mut highlights = Vec::new();
    let mut action_items = Vec::new();

    if let Some(lc) = &data.leetcode {
        let today: u32 = lc
            .recent_activity
            .iter()
            .filter(|a| is_within_last_day(a.date, now))
            .map(|a| a.count)
            .sum();
        if today > 0 {
            highlights.push(format!("Made {} LeetCode submissions today", today));
        } else {
            action_items.push("Solve at least one LeetCode problem today".to_string());
        }
    }

    if let Some(cf) = &data.codeforces {
        let today: Vec<_> = cf
            .recent_submissions
            .iter()
            .filter(|s| is_within_last_day(s.submitted_at, now))
            .collect();
        if today.is_empty() {
            action_items.push("Practice a Codeforces problem today".to_string());
        } else {
            let accepted = today.iter().filter(|s| s.is_accepted()).count();
            highlights.push(format!(
                "Made {} Codeforces submissions today ({} accepted)",
                today.len(),
                accepted
            ));
        }
    }

    if let Some(gh) = &data.github {
        let commits = gh
            .recent_commits
            .iter()
            .filter(|c| is_within_last_day(c.committed_at, now))
            .count();
        if commits > 0 {
            highlights.push(format!("Pushed {} GitHub commits today", commits));
        }
        if gh.current_streak == 0 {
            action_items.push("Make a commit to start a new GitHub streak".to_string());
        }
    }

    if let Some(rd) = &data.reddit {
        let posts = rd
            .recent_posts
            .iter()
            .filter(|p| is_within_last_day(p.created_at, now))
            .count();
        let comments = rd
            .recent_comments
            .iter()
            .filter(|c| is_within_last_day(c.created_at, now))
            .count();
        if posts + comments > 0 {
            highlights.push(format!(
                "Posted {} times and commented {} times on Reddit today",
                posts, comments
            ));
        }
    }

    if let Some(em) = &data.email {
        let received = em
            .recent_emails
            .iter()
            .filter(|e| is_within_last_day(e.received_at, now))
            .count();
        if received > 0 {
            highlights.push(format!("Received {} emails today", received));
        }
        if em.unread_count > UNREAD_EMAIL_THRESHOLD {
            action_items.push(format!(
                "You have {} unread emails, consider clearing your inbox",
                em.unread_count
            ));
        }
    }

    let connected = data.connected().len();
    let summary = if connected == 0 {
        "Connect a service to start building your daily digest.".to_string()
    } else if highlights.is_empty() {
        format!(
            "No activity in the last 24 hours across {} connected service{}.",
            connected,
            plural(connected)
        )
    } else {
        format!(
            "{} highlight{} across {} connected service{}.",
            highlights.len(),
            plural(highlights.len()),
            connected,
            plural(connected)
        )
    };

    DailyDigest {
        title: format!("Daily Digest for {}", now.format("%A, %B %-d")),
        summary,
        highlights,
        action_items,
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ActivityAnalysis, SubmissionAnalysis};
    use crate::models::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 18, 0, 0).unwrap()
    }

    fn leetcode(ranking: u64, today_count: u32) -> LeetCodeStats {
        LeetCodeStats {
            username: "alice".into(),
            total_solved: 120,
            total_questions: 3000,
            easy_solved: 60,
            total_easy: 800,
            medium_solved: 50,
            total_medium: 1600,
            hard_solved: 10,
            total_hard: 600,
            acceptance_rate: 55.0,
            ranking,
            contribution_points: 10,
            reputation: 0,
            recent_activity: vec![DailyActivity {
                date: Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap(),
                count: today_count,
            }],
            origin: DataOrigin::Live,
        }
    }

    fn github(current_streak: u32) -> GitHubStats {
        GitHubStats {
            username: "octocat".into(),
            name: None,
            public_repos: 8,
            followers: 3,
            following: 1,
            total_stars: 42,
            total_forks: 2,
            top_languages: vec![LanguageUsage {
                language: "Rust".into(),
                bytes: 1000,
            }],
            most_starred_repo: None,
            recent_commits: vec![GitHubCommit {
                sha: "abc".into(),
                repo: "octocat/hello".into(),
                message: "fix".into(),
                committed_at: now() - Duration::hours(2),
                url: None,
            }],
            contributions: Vec::new(),
            current_streak,
            longest_streak: 9,
            origin: DataOrigin::Live,
        }
    }

    fn email(unread: u32) -> EmailStats {
        EmailStats {
            email: "me@example.com".into(),
            total_messages: 500,
            total_threads: 300,
            unread_count: unread,
            recent_emails: Vec::new(),
            origin: DataOrigin::Live,
        }
    }

    fn reddit() -> RedditStats {
        let mut analysis = ActivityAnalysis::default();
        analysis.subreddit_distribution.insert("rust".into(), 3);
        RedditStats {
            username: "spez".into(),
            link_karma: 10,
            comment_karma: 5,
            total_karma: 15,
            account_created: None,
            recent_posts: Vec::new(),
            recent_comments: Vec::new(),
            analysis,
            origin: DataOrigin::Live,
        }
    }

    fn data() -> AggregatedServicesData {
        AggregatedServicesData::empty(now(), Duration::minutes(30))
    }

    #[test]
    fn test_should_update_boundary_is_due() {
        let interval = Duration::minutes(30);
        let last = now();
        assert!(!should_update(last, last + Duration::minutes(29), interval));
        assert!(should_update(last, last + Duration::minutes(30), interval));
        assert!(should_update(last, last + Duration::hours(5), interval));
    }

    #[test]
    fn test_insights_empty_when_nothing_connected() {
        assert!(generate_user_insights(&data()).is_empty());
    }

    #[test]
    fn test_ranking_only_mentioned_when_notable() {
        let mut d = data();
        d.leetcode = Some(leetcode(100_000, 0));
        let insights = generate_user_insights(&d);
        assert!(insights.iter().any(|s| s.contains("#100000")));

        d.leetcode = Some(leetcode(100_001, 0));
        let insights = generate_user_insights(&d);
        assert!(!insights.iter().any(|s| s.contains("ranking")));
    }

    #[test]
    fn test_insights_follow_provider_priority() {
        let mut d = data();
        d.email = Some(email(3));
        d.github = Some(github(4));
        d.reddit = Some(reddit());
        d.leetcode = Some(leetcode(5_000, 1));
        let insights = generate_user_insights(&d);

        let pos = |needle: &str| insights.iter().position(|s| s.contains(needle)).unwrap();
        assert!(pos("LeetCode problems") < pos("GitHub repositories"));
        assert!(pos("GitHub repositories") < pos("Reddit karma"));
        assert!(pos("Reddit karma") < pos("unread emails"));
        assert!(insights.iter().any(|s| s.contains("4-day GitHub")));
        assert!(insights.iter().any(|s| s.contains("r/rust")));
    }

    #[test]
    fn test_codeforces_peak_gap() {
        let mut d = data();
        d.codeforces = Some(CodeforcesStats {
            handle: "tourist".into(),
            rating: 1500,
            max_rating: 1650,
            rank: "specialist".into(),
            max_rank: "expert".into(),
            friend_of_count: 0,
            contests_participated: 3,
            analysis: SubmissionAnalysis::default(),
            recent_submissions: Vec::new(),
            rating_history: Vec::new(),
            origin: DataOrigin::Live,
        });
        let insights = generate_user_insights(&d);
        assert_eq!(
            insights,
            vec![
                "Your Codeforces rating is 1500 (specialist).".to_string(),
                "You are 150 points below your peak Codeforces rating of 1650.".to_string(),
            ]
        );
    }

    #[test]
    fn test_digest_action_items() {
        let mut d = data();
        d.email = Some(email(11));
        d.github = Some(github(0));
        d.leetcode = Some(leetcode(0, 0));
        let digest = generate_daily_digest(&d, now());

        assert_eq!(
            digest.action_items,
            vec![
                "Solve at least one LeetCode problem today".to_string(),
                "Make a commit to start a new GitHub streak".to_string(),
                "You have 11 unread emails, consider clearing your inbox".to_string(),
            ]
        );
        assert_eq!(digest.highlights, vec!["Pushed 1 GitHub commits today"]);
        assert_eq!(digest.title, "Daily Digest for Friday, May 10");
    }

    #[test]
    fn test_digest_unread_threshold_is_exclusive() {
        let mut d = data();
        d.email = Some(email(10));
        let digest = generate_daily_digest(&d, now());
        assert!(digest.action_items.is_empty());
    }

    #[test]
    fn test_digest_highlights_today_only() {
        let mut d = data();
        let mut gh = github(2);
        gh.recent_commits[0].committed_at = now() - Duration::hours(30);
        d.github = Some(gh);
        d.leetcode = Some(leetcode(0, 3));
        let digest = generate_daily_digest(&d, now());
        assert_eq!(digest.highlights, vec!["Made 3 LeetCode submissions today"]);
        assert!(digest.summary.starts_with("1 highlight across 2 connected services"));
    }

    #[test]
    fn test_digest_is_repeatable() {
        let mut d = data();
        d.github = Some(github(1));
        d.email = Some(email(20));
        assert_eq!(
            generate_daily_digest(&d, now()),
            generate_daily_digest(&d, now())
        );
    }

    #[test]
    fn test_digest_nothing_connected() {
        let digest = generate_daily_digest(&data(), now());
        assert!(digest.highlights.is_empty());
        assert!(digest.action_items.is_empty());
        assert!(digest.summary.starts_with("Connect a service"));
    }
}
