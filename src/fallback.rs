//! Synthetic stand-in records for demo mode.
//!
//! When `aggregator.demo_mode` is enabled, a provider that fails is filled
//! in from a [`FallbackDataSource`] instead of being left empty. Synthetic
//! records are always marked [`DataOrigin::Synthetic`] and every item id is
//! prefixed with [`FALLBACK_ID_PREFIX`], so they can never be mistaken for
//! live data.
//!
//! [`SyntheticFallback`] seeds its RNG from the SHA-256 of
//! `provider:identity`. The same identity yields the same numbers on every
//! run; only timestamps move with `now`.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use taskflow_core::analysis::{
    analyze_activity, analyze_submissions, compute_streaks, daily_counts, first_max,
};
use taskflow_core::models::{
    CodeforcesStats, CodeforcesSubmission, DailyActivity, EmailStats, EmailSummary, GitHubCommit,
    GitHubStats, LanguageUsage, LeetCodeStats, RatingChange, RedditComment, RedditPost,
    RedditStats, RepoSummary, FALLBACK_ID_PREFIX, HISTORY_CAP, RECENT_ITEMS_CAP,
};
use taskflow_core::{DataOrigin, Provider, ProviderStats};

use crate::provider_github::CONTRIBUTION_WINDOW_DAYS;

/// A source of stand-in records for providers that produced no live data.
pub trait FallbackDataSource: Send + Sync {
    fn synthesize(&self, provider: Provider, identity: &str, now: DateTime<Utc>) -> ProviderStats;
}

/// Deterministic, bounded synthetic data.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticFallback;

impl FallbackDataSource for SyntheticFallback {
    fn synthesize(&self, provider: Provider, identity: &str, now: DateTime<Utc>) -> ProviderStats {
        let mut rng = seeded_rng(provider, identity);
        let identity = identity.trim();
        match provider {
            Provider::LeetCode => ProviderStats::LeetCode(leetcode(&mut rng, identity, now)),
            Provider::Codeforces => ProviderStats::Codeforces(codeforces(&mut rng, identity, now)),
            Provider::GitHub => ProviderStats::GitHub(github(&mut rng, identity, now)),
            Provider::Reddit => ProviderStats::Reddit(reddit(&mut rng, identity, now)),
            Provider::Email => ProviderStats::Email(email(&mut rng, identity, now)),
        }
    }
}

fn seeded_rng(provider: Provider, identity: &str) -> StdRng {
    let digest = Sha256::digest(format!("{}:{}", provider.as_str(), identity.trim()).as_bytes());
    StdRng::from_seed(digest.into())
}

fn fallback_id(kind: &str, n: usize) -> String {
    format!("{}{}_{}", FALLBACK_ID_PREFIX, kind, n)
}

/// A timestamp within the last `days` days.
fn recent_instant(rng: &mut StdRng, now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::minutes(rng.gen_range(0..days * 24 * 60))
}

fn leetcode(rng: &mut StdRng, username: &str, now: DateTime<Utc>) -> LeetCodeStats {
    let (total_easy, total_medium, total_hard) = (850, 1780, 790);
    let easy_solved = rng.gen_range(20..=300);
    let medium_solved = rng.gen_range(10..=250);
    let hard_solved = rng.gen_range(0..=60);

    let recent_activity: Vec<DailyActivity> = (0..HISTORY_CAP as i64)
        .filter_map(|days_back| {
            let count = rng.gen_range(0..=5u32);
            (count > 0).then(|| DailyActivity {
                date: now - Duration::days(days_back),
                count,
            })
        })
        .collect();

    LeetCodeStats {
        username: username.to_string(),
        total_solved: easy_solved + medium_solved + hard_solved,
        total_questions: total_easy + total_medium + total_hard,
        easy_solved,
        total_easy,
        medium_solved,
        total_medium,
        hard_solved,
        total_hard,
        acceptance_rate: (rng.gen_range(3500..=7500u32) as f64) / 100.0,
        ranking: rng.gen_range(5_000..=800_000),
        contribution_points: rng.gen_range(0..=500),
        reputation: rng.gen_range(0..=100),
        recent_activity,
        origin: DataOrigin::Synthetic,
    }
}

const CODEFORCES_RANKS: [(u32, &str); 6] = [
    (0, "newbie"),
    (1200, "pupil"),
    (1400, "specialist"),
    (1600, "expert"),
    (1900, "candidate master"),
    (2100, "master"),
];

fn codeforces_rank(rating: u32) -> String {
    CODEFORCES_RANKS
        .iter()
        .rev()
        .find(|(floor, _)| rating >= *floor)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| "newbie".to_string())
}

fn codeforces(rng: &mut StdRng, handle: &str, now: DateTime<Utc>) -> CodeforcesStats {
    const LANGUAGES: [&str; 3] = ["GNU C++17", "Python 3", "Rust 2021"];
    const VERDICTS: [&str; 4] = ["OK", "OK", "WRONG_ANSWER", "TIME_LIMIT_EXCEEDED"];

    let mut submissions: Vec<CodeforcesSubmission> = (0..rng.gen_range(15..=40))
        .map(|n| {
            let contest = rng.gen_range(1500..=1900);
            let index = ["A", "B", "C", "D"][rng.gen_range(0..4)];
            CodeforcesSubmission {
                id: fallback_id("submission", n),
                problem_key: format!("{}-{}", contest, index),
                problem_name: format!("Problem {}{}", contest, index),
                problem_rating: Some(rng.gen_range(8..=20) * 100),
                language: LANGUAGES[rng.gen_range(0..LANGUAGES.len())].to_string(),
                verdict: VERDICTS[rng.gen_range(0..VERDICTS.len())].to_string(),
                submitted_at: recent_instant(rng, now, 30),
            }
        })
        .collect();
    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    let analysis = analyze_submissions(&submissions);
    submissions.truncate(RECENT_ITEMS_CAP);

    let contests = rng.gen_range(3..=12usize);
    let mut rating = rng.gen_range(1000..=1400u32);
    let mut max_rating = rating;
    let mut rating_history = Vec::with_capacity(contests);
    for n in 0..contests {
        let old_rating = rating;
        rating = (rating + rng.gen_range(0..=160)).saturating_sub(70).max(800);
        max_rating = max_rating.max(rating);
        rating_history.push(RatingChange {
            contest_id: 1800 + n as u64,
            contest_name: format!("Codeforces Round {}", 900 + n),
            rank: rng.gen_range(50..=8000),
            old_rating,
            new_rating: rating,
            updated_at: now - Duration::days(7 * (contests - n) as i64),
        });
    }
    rating_history.reverse();
    rating_history.truncate(HISTORY_CAP);

    CodeforcesStats {
        handle: handle.to_string(),
        rating,
        max_rating,
        rank: codeforces_rank(rating),
        max_rank: codeforces_rank(max_rating),
        friend_of_count: rng.gen_range(0..=200),
        contests_participated: contests as u32,
        analysis,
        recent_submissions: submissions,
        rating_history,
        origin: DataOrigin::Synthetic,
    }
}

fn github(rng: &mut StdRng, username: &str, now: DateTime<Utc>) -> GitHubStats {
    const LANGUAGES: [&str; 5] = ["Rust", "TypeScript", "Python", "Go", "Shell"];

    let repos: Vec<RepoSummary> = (0..rng.gen_range(3..=12))
        .map(|n| RepoSummary {
            name: format!("project-{}", n + 1),
            full_name: format!("{}/project-{}", username, n + 1),
            stars: rng.gen_range(0..=250),
            forks: rng.gen_range(0..=40),
            language: Some(LANGUAGES[rng.gen_range(0..LANGUAGES.len())].to_string()),
            updated_at: Some(recent_instant(rng, now, 60)),
        })
        .collect();

    let mut commits: Vec<GitHubCommit> = (0..rng.gen_range(10..=60))
        .map(|n| {
            let repo = &repos[rng.gen_range(0..repos.len())];
            GitHubCommit {
                sha: fallback_id("commit", n),
                repo: repo.name.clone(),
                message: format!("Update {}", repo.name),
                committed_at: recent_instant(rng, now, i64::from(CONTRIBUTION_WINDOW_DAYS)),
                url: None,
            }
        })
        .collect();

    let contributions = daily_counts(
        commits.iter().map(|c| c.committed_at),
        now.date_naive(),
        CONTRIBUTION_WINDOW_DAYS,
    );
    let counts: Vec<u32> = contributions.iter().map(|d| d.count).collect();
    let streaks = compute_streaks(&counts);
    commits.sort_by(|a, b| b.committed_at.cmp(&a.committed_at));
    commits.truncate(HISTORY_CAP);

    let mut top_languages: Vec<LanguageUsage> = LANGUAGES
        .iter()
        .take(rng.gen_range(1..=LANGUAGES.len()))
        .map(|language| LanguageUsage {
            language: language.to_string(),
            bytes: rng.gen_range(1_000..=500_000),
        })
        .collect();
    top_languages.sort_by(|a, b| b.bytes.cmp(&a.bytes));

    GitHubStats {
        username: username.to_string(),
        name: None,
        public_repos: repos.len() as u32,
        followers: rng.gen_range(0..=500),
        following: rng.gen_range(0..=200),
        total_stars: repos.iter().map(|r| r.stars).sum(),
        total_forks: repos.iter().map(|r| r.forks).sum(),
        top_languages,
        most_starred_repo: first_max(repos.iter(), |r| r.stars).cloned(),
        recent_commits: commits,
        contributions,
        current_streak: streaks.current,
        longest_streak: streaks.longest,
        origin: DataOrigin::Synthetic,
    }
}

fn reddit(rng: &mut StdRng, username: &str, now: DateTime<Utc>) -> RedditStats {
    const SUBREDDITS: [&str; 4] = ["rust", "programming", "learnprogramming", "productivity"];

    let mut posts: Vec<RedditPost> = (0..rng.gen_range(0..=15))
        .map(|n| {
            let subreddit = SUBREDDITS[rng.gen_range(0..SUBREDDITS.len())];
            let id = fallback_id("post", n);
            RedditPost {
                title: format!("Post {} in r/{}", n + 1, subreddit),
                subreddit: subreddit.to_string(),
                score: rng.gen_range(0..=400),
                num_comments: rng.gen_range(0..=80),
                created_at: recent_instant(rng, now, 90),
                permalink: format!("/r/{}/comments/{}", subreddit, id),
                id,
            }
        })
        .collect();
    let mut comments: Vec<RedditComment> = (0..rng.gen_range(0..=25))
        .map(|n| RedditComment {
            id: fallback_id("comment", n),
            body: "Thanks for sharing this.".to_string(),
            subreddit: SUBREDDITS[rng.gen_range(0..SUBREDDITS.len())].to_string(),
            score: rng.gen_range(0..=60),
            created_at: recent_instant(rng, now, 90),
            link_title: None,
        })
        .collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let analysis = analyze_activity(&posts, &comments);
    posts.truncate(RECENT_ITEMS_CAP);
    comments.truncate(RECENT_ITEMS_CAP);

    let link_karma = rng.gen_range(0..=20_000);
    let comment_karma = rng.gen_range(0..=40_000);

    RedditStats {
        username: username.to_string(),
        link_karma,
        comment_karma,
        total_karma: link_karma + comment_karma,
        account_created: Some(now - Duration::days(rng.gen_range(200..=4000))),
        recent_posts: posts,
        recent_comments: comments,
        analysis,
        origin: DataOrigin::Synthetic,
    }
}

fn email(rng: &mut StdRng, address: &str, now: DateTime<Utc>) -> EmailStats {
    const SENDERS: [&str; 4] = [
        "GitHub <noreply@github.com>",
        "LeetCode <no-reply@leetcode.com>",
        "Team Calendar <calendar@example.com>",
        "Newsletter <news@example.com>",
    ];

    let mut recent_emails: Vec<EmailSummary> = (0..RECENT_ITEMS_CAP)
        .map(|n| EmailSummary {
            id: fallback_id("email", n),
            subject: format!("Update #{}", n + 1),
            from: SENDERS[rng.gen_range(0..SENDERS.len())].to_string(),
            snippet: "This is a placeholder message.".to_string(),
            received_at: recent_instant(rng, now, 3),
            is_unread: rng.gen_bool(0.4),
            is_important: rng.gen_bool(0.2),
        })
        .collect();
    recent_emails.sort_by(|a, b| b.received_at.cmp(&a.received_at));

    let total_messages = rng.gen_range(200..=20_000);
    EmailStats {
        email: address.to_string(),
        total_messages,
        total_threads: total_messages * 2 / 3,
        unread_count: rng.gen_range(0..=40),
        recent_emails,
        origin: DataOrigin::Synthetic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_same_identity_same_record() {
        for p in Provider::ALL {
            let a = SyntheticFallback.synthesize(p, "alice", now());
            let b = SyntheticFallback.synthesize(p, "alice", now());
            assert_eq!(a, b, "{} not deterministic", p);
            assert_eq!(a.provider(), p);
            assert_eq!(a.origin(), DataOrigin::Synthetic);
        }
    }

    #[test]
    fn test_identity_changes_record() {
        let a = SyntheticFallback.synthesize(Provider::LeetCode, "alice", now());
        let b = SyntheticFallback.synthesize(Provider::LeetCode, "bob", now());
        assert_ne!(a, b);
    }

    #[test]
    fn test_leetcode_values_are_bounded() {
        let ProviderStats::LeetCode(s) = SyntheticFallback.synthesize(Provider::LeetCode, "carol", now())
        else {
            panic!("wrong provider");
        };
        assert!(s.easy_solved <= s.total_easy);
        assert!(s.medium_solved <= s.total_medium);
        assert!(s.hard_solved <= s.total_hard);
        assert!((0.0..=100.0).contains(&s.acceptance_rate));
        assert!(s.recent_activity.len() <= HISTORY_CAP);
        assert!(s.recent_activity.iter().all(|d| d.count > 0));
    }

    #[test]
    fn test_item_ids_are_marked() {
        let ProviderStats::Codeforces(s) =
            SyntheticFallback.synthesize(Provider::Codeforces, "dave", now())
        else {
            panic!("wrong provider");
        };
        assert!(s.max_rating >= s.rating);
        assert!(s.recent_submissions.len() <= RECENT_ITEMS_CAP);
        assert!(s
            .recent_submissions
            .iter()
            .all(|sub| sub.id.starts_with(FALLBACK_ID_PREFIX)));

        let ProviderStats::Email(e) = SyntheticFallback.synthesize(Provider::Email, "e@x.io", now())
        else {
            panic!("wrong provider");
        };
        assert!(e.recent_emails.iter().all(|m| m.id.starts_with(FALLBACK_ID_PREFIX)));
    }

    #[test]
    fn test_github_streaks_match_contributions() {
        let ProviderStats::GitHub(s) = SyntheticFallback.synthesize(Provider::GitHub, "erin", now())
        else {
            panic!("wrong provider");
        };
        let counts: Vec<u32> = s.contributions.iter().map(|d| d.count).collect();
        let streaks = compute_streaks(&counts);
        assert_eq!(s.current_streak, streaks.current);
        assert_eq!(s.longest_streak, streaks.longest);
        assert_eq!(s.contributions.len(), CONTRIBUTION_WINDOW_DAYS as usize);
    }

    #[test]
    fn test_codeforces_rank_floors() {
        assert_eq!(codeforces_rank(800), "newbie");
        assert_eq!(codeforces_rank(1400), "specialist");
        assert_eq!(codeforces_rank(2500), "master");
    }
}
