//! Activity reports for the terminal.
//!
//! Backs `taskflow stats`, `taskflow insights`, and `taskflow digest`. Each
//! command runs one fan-out over the configured identities and prints the
//! result, either as a summary table or as JSON.

use anyhow::Result;
use chrono::{DateTime, Utc};

use taskflow_core::{AggregatedServicesData, DataOrigin, Provider, ProviderStats};

use crate::aggregator::ExternalServicesAggregator;
use crate::config::Config;

async fn fetch(config: &Config) -> Result<(ExternalServicesAggregator, AggregatedServicesData)> {
    if config.identities.configured().is_empty() {
        anyhow::bail!("no identities configured; add an [identities] section to the config file");
    }
    let aggregator = ExternalServicesAggregator::from_config(config)?;
    let data = aggregator.fetch_all_user_data(&config.identities).await;
    Ok((aggregator, data))
}

/// Run the stats command: fetch every provider and print a summary.
pub async fn run_stats(config: &Config, json: bool) -> Result<()> {
    let (_, data) = fetch(config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("TaskFlow — Activity Stats");
    println!("=========================");
    println!();
    println!("  Updated:     {}", format_ts_relative(data.last_updated, Utc::now()));
    println!("  Next update: {}", data.next_update.format("%Y-%m-%d %H:%M UTC"));
    println!();
    println!("  {:<12} {:<10} {}", "PROVIDER", "SOURCE", "SUMMARY");
    println!("  {}", "-".repeat(72));

    for provider in Provider::ALL {
        let Some(identity) = config.identities.get(provider) else {
            continue;
        };
        match provider_record(&data, provider) {
            Some(stats) => println!(
                "  {:<12} {:<10} {}",
                provider.as_str(),
                origin_label(stats.origin()),
                summary_line(&stats)
            ),
            None => {
                let reason = data
                    .failures
                    .get(&provider)
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "no data".to_string());
                println!(
                    "  {:<12} {:<10} {} ({})",
                    provider.as_str(),
                    "-",
                    reason,
                    identity
                );
            }
        }
    }

    let degraded: Vec<String> = data
        .failures
        .iter()
        .filter(|(p, _)| data.contains(**p))
        .map(|(p, k)| format!("{} ({})", p.as_str(), k))
        .collect();
    if !degraded.is_empty() {
        println!();
        println!("  Synthetic stand-ins for: {}", degraded.join(", "));
    }
    println!();
    Ok(())
}

pub async fn run_insights(config: &Config) -> Result<()> {
    let (aggregator, data) = fetch(config).await?;
    let insights = aggregator.generate_user_insights(&data);
    if insights.is_empty() {
        println!("No insights yet.");
        return Ok(());
    }
    for insight in insights {
        println!("• {}", insight);
    }
    Ok(())
}

pub async fn run_digest(config: &Config) -> Result<()> {
    let (aggregator, data) = fetch(config).await?;
    let digest = aggregator.generate_daily_digest(&data);

    println!("{}", digest.title);
    println!("{}", "=".repeat(digest.title.chars().count()));
    println!();
    println!("{}", digest.summary);
    if !digest.highlights.is_empty() {
        println!();
        println!("Highlights:");
        for h in &digest.highlights {
            println!("  • {}", h);
        }
    }
    if !digest.action_items.is_empty() {
        println!();
        println!("Action items:");
        for a in &digest.action_items {
            println!("  [ ] {}", a);
        }
    }
    Ok(())
}

fn provider_record(data: &AggregatedServicesData, provider: Provider) -> Option<ProviderStats> {
    match provider {
        Provider::LeetCode => data.leetcode.clone().map(ProviderStats::LeetCode),
        Provider::Codeforces => data.codeforces.clone().map(ProviderStats::Codeforces),
        Provider::GitHub => data.github.clone().map(ProviderStats::GitHub),
        Provider::Reddit => data.reddit.clone().map(ProviderStats::Reddit),
        Provider::Email => data.email.clone().map(ProviderStats::Email),
    }
}

fn origin_label(origin: DataOrigin) -> &'static str {
    match origin {
        DataOrigin::Live => "live",
        DataOrigin::Synthetic => "synthetic",
    }
}

/// One-line summary of a provider record.
fn summary_line(stats: &ProviderStats) -> String {
    match stats {
        ProviderStats::LeetCode(s) => format!(
            "{} solved ({}E/{}M/{}H), {:.1}% acceptance",
            s.total_solved, s.easy_solved, s.medium_solved, s.hard_solved, s.acceptance_rate
        ),
        ProviderStats::Codeforces(s) => format!(
            "rating {} (max {}), {} solved, {} contests",
            s.rating, s.max_rating, s.analysis.problems_solved, s.contests_participated
        ),
        ProviderStats::GitHub(s) => format!(
            "{} repos, {} stars, streak {} (longest {})",
            s.public_repos, s.total_stars, s.current_streak, s.longest_streak
        ),
        ProviderStats::Reddit(s) => format!(
            "{} karma, {} posts, {} comments",
            s.total_karma, s.analysis.total_posts, s.analysis.total_comments
        ),
        ProviderStats::Email(s) => format!(
            "{} messages, {} unread",
            s.total_messages, s.unread_count
        ),
    }
}

/// Format a timestamp relative to `now` (e.g. "3 hours ago").
fn format_ts_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - ts).num_seconds();

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
