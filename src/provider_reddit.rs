//! Reddit provider.
//!
//! Uses the public JSON endpoints under `/user/{name}/`. Reddit rejects
//! requests without a descriptive `User-Agent`, so the configured agent is
//! sent explicitly on every call.
//!
//! The `about` call is required. The submitted and comments listings are
//! best-effort: a failing listing is logged and treated as empty.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use taskflow_core::analysis::analyze_activity;
use taskflow_core::models::{RedditComment, RedditPost, RedditStats, RECENT_ITEMS_CAP};
use taskflow_core::{DataOrigin, Provider, ProviderStats};

use crate::config::RedditConfig;
use crate::error::Result;
use crate::http::{endpoint, HttpClient};
use crate::normalize::{clamp_u32, clamp_u64, first_line, from_unix_secs_f64};
use crate::traits::{require_identity, StatsProvider};

const LISTING_LIMIT: &str = "25";
const COMMENT_BODY_CHARS: usize = 280;

pub struct RedditProvider {
    http: HttpClient,
    config: RedditConfig,
}

impl RedditProvider {
    pub fn new(http: HttpClient, config: RedditConfig) -> Self {
        Self { http, config }
    }

    async fn get<T: DeserializeOwned>(&self, username: &str, page: &str) -> Result<T> {
        let url = endpoint(&self.config.base_url, &["user", username, page])?;
        let query: &[(&str, &str)] = if page == "about.json" {
            &[]
        } else {
            &[("limit", LISTING_LIMIT)]
        };
        self.http
            .get_json(url, query, &[("User-Agent", self.config.user_agent.as_str())])
            .await
    }

    async fn listing<T: DeserializeOwned>(&self, username: &str, page: &str) -> Vec<T> {
        match self.get::<Listing<T>>(username, page).await {
            Ok(listing) => listing.into_items(),
            Err(e) => {
                warn!(user = username, page, error = %e, "reddit listing unavailable");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    #[serde(default = "Vec::new")]
    children: Vec<Thing<T>>,
}

impl<T> Listing<T> {
    fn into_items(self) -> Vec<T> {
        self.data.children.into_iter().map(|c| c.data).collect()
    }
}

#[derive(Debug, Deserialize)]
struct About {
    name: String,
    #[serde(default)]
    link_karma: i64,
    #[serde(default)]
    comment_karma: i64,
    #[serde(default)]
    total_karma: Option<i64>,
    #[serde(default)]
    created_utc: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    created_utc: f64,
    #[serde(default)]
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct Comment {
    id: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    score: i64,
    created_utc: f64,
    #[serde(default)]
    link_title: Option<String>,
}

#[async_trait]
impl StatsProvider for RedditProvider {
    fn provider(&self) -> Provider {
        Provider::Reddit
    }

    fn description(&self) -> &str {
        "Reddit karma, recent posts and comments, subreddit activity"
    }

    async fn fetch_stats(&self, identity: &str) -> Result<ProviderStats> {
        let username = require_identity(identity)?;

        let (about, posts, comments) = tokio::join!(
            self.get::<Thing<About>>(username, "about.json"),
            self.listing::<Post>(username, "submitted.json"),
            self.listing::<Comment>(username, "comments.json"),
        );

        Ok(ProviderStats::Reddit(normalize(about?.data, posts, comments)))
    }
}

fn normalize(about: About, posts: Vec<Post>, comments: Vec<Comment>) -> RedditStats {
    let mut posts: Vec<RedditPost> = posts
        .into_iter()
        .filter_map(|p| {
            Some(RedditPost {
                created_at: from_unix_secs_f64(p.created_utc)?,
                id: p.id,
                title: p.title,
                subreddit: p.subreddit,
                score: clamp_u32(p.score),
                num_comments: clamp_u32(p.num_comments),
                permalink: p.permalink,
            })
        })
        .collect();
    let mut comments: Vec<RedditComment> = comments
        .into_iter()
        .filter_map(|c| {
            Some(RedditComment {
                created_at: from_unix_secs_f64(c.created_utc)?,
                id: c.id,
                body: first_line(&c.body, COMMENT_BODY_CHARS),
                subreddit: c.subreddit,
                score: clamp_u32(c.score),
                link_title: c.link_title,
            })
        })
        .collect();

    // Listings arrive newest first already; analysis keeps that order so
    // the most-popular tie-break follows the listing.
    let analysis = analyze_activity(&posts, &comments);
    posts.truncate(RECENT_ITEMS_CAP);
    comments.truncate(RECENT_ITEMS_CAP);

    let link_karma = clamp_u64(about.link_karma);
    let comment_karma = clamp_u64(about.comment_karma);
    let total_karma = match about.total_karma {
        Some(total) => clamp_u64(total),
        None => link_karma + comment_karma,
    };

    RedditStats {
        username: about.name,
        link_karma,
        comment_karma,
        total_karma,
        account_created: about.created_utc.and_then(from_unix_secs_f64),
        recent_posts: posts,
        recent_comments: comments,
        analysis,
        origin: DataOrigin::Live,
    }
}
