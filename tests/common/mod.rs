//! A local stand-in for the five upstream APIs.
//!
//! Each provider lives under its own path prefix so one server on an
//! ephemeral port can back every client. Well-known identities:
//!
//! | Identity | Behavior |
//! |----------|----------|
//! | `alice` (LeetCode) | Success |
//! | `ghost` (LeetCode, Codeforces) | Account does not exist |
//! | `slow` (LeetCode) | Answers after 5 seconds |
//! | `flaky` (LeetCode) | 503 on the first call, then success |
//! | `sleepy` (LeetCode) | First call answers after 1.5 seconds, then success |
//! | `garbled` (LeetCode) | 200 with a body that is not JSON |
//! | `tourist` (Codeforces) | Success |
//! | `octocat` (GitHub) | Success; repo `broken` fails its commits call |
//! | `spez` (Reddit) | Success when the test user agent is sent; comments fail |
//! | any (Email) | Success with bearer `test-token`; message `missing` is 404 |

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use taskflow::config::{parse_config, Config};

pub const USER_AGENT: &str = "taskflow-test/1.0";
pub const GMAIL_TOKEN: &str = "test-token";

/// Start the fake upstream and return its address.
pub async fn spawn_upstream() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream_router()).await.unwrap();
    });
    addr
}

/// Config pointing every provider at `addr`, with retries off.
///
/// `gmail_token_env` names the variable the email client reads its token from.
pub fn config_for(addr: SocketAddr, gmail_token_env: &str, extra: &str) -> Config {
    config_with_retries(addr, gmail_token_env, 0, extra)
}

pub fn config_with_retries(
    addr: SocketAddr,
    gmail_token_env: &str,
    max_retries: u32,
    extra: &str,
) -> Config {
    parse_config(&format!(
        r#"
[aggregator]
request_timeout_secs = 3
max_retries = {max_retries}
retry_backoff_ms = 10

[providers.leetcode]
base_url = "http://{addr}/leetcode"

[providers.codeforces]
base_url = "http://{addr}/codeforces"

[providers.github]
base_url = "http://{addr}/github"
token_env = "TASKFLOW_TEST_UNSET_GITHUB_TOKEN"

[providers.reddit]
base_url = "http://{addr}/reddit"
user_agent = "{ua}"

[providers.email]
base_url = "http://{addr}/gmail"
access_token_env = "{gmail_token_env}"

{extra}
"#,
        addr = addr,
        max_retries = max_retries,
        ua = USER_AGENT,
        gmail_token_env = gmail_token_env,
        extra = extra,
    ))
    .unwrap()
}

fn upstream_router() -> Router {
    Router::new()
        .route("/leetcode/{user}", get(leetcode))
        .route("/codeforces/user.info", get(codeforces_info))
        .route("/codeforces/user.status", get(codeforces_status))
        .route("/codeforces/user.rating", get(codeforces_rating))
        .route("/github/users/{user}", get(github_user))
        .route("/github/users/{user}/repos", get(github_repos))
        .route("/github/repos/{owner}/{repo}/commits", get(github_commits))
        .route("/github/repos/{owner}/{repo}/languages", get(github_languages))
        .route("/reddit/user/{user}/about.json", get(reddit_about))
        .route("/reddit/user/{user}/submitted.json", get(reddit_submitted))
        .route("/reddit/user/{user}/comments.json", get(reddit_comments))
        .route("/gmail/users/me/profile", get(gmail_profile))
        .route("/gmail/users/me/messages", get(gmail_messages))
        .route("/gmail/users/me/messages/{id}", get(gmail_message))
}

static FLAKY_CALLS: AtomicUsize = AtomicUsize::new(0);
static SLEEPY_CALLS: AtomicUsize = AtomicUsize::new(0);

fn now_secs() -> i64 {
    Utc::now().timestamp()
}

// ============ LeetCode ============

async fn leetcode(Path(user): Path<String>) -> Response {
    match user.as_str() {
        "ghost" => Json(json!({"status": "error", "message": "user does not exist"})).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"status": "error", "message": "too slow"})).into_response()
        }
        "garbled" => "<html>maintenance</html>".into_response(),
        "flaky" if FLAKY_CALLS.fetch_add(1, Ordering::SeqCst) == 0 => {
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
        "sleepy" if SLEEPY_CALLS.fetch_add(1, Ordering::SeqCst) == 0 => {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            Json(json!({"status": "error", "message": "too slow"})).into_response()
        }
        _ => Json(json!({
            "status": "success",
            "totalSolved": 150, "totalQuestions": 3200,
            "easySolved": 70, "totalEasy": 820,
            "mediumSolved": 60, "totalMedium": 1700,
            "hardSolved": 20, "totalHard": 680,
            "acceptanceRate": 62.3,
            "ranking": 45000,
            "contributionPoints": 12,
            "reputation": 4,
            "submissionCalendar": { now_secs().to_string(): 3 }
        }))
        .into_response(),
    }
}

// ============ Codeforces ============

fn codeforces_missing(handle: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "status": "FAILED",
            "comment": format!("handle: User with handle {} not found", handle)
        })),
    )
        .into_response()
}

async fn codeforces_info(Query(q): Query<HashMap<String, String>>) -> Response {
    let handle = q.get("handles").cloned().unwrap_or_default();
    if handle == "ghost" {
        return codeforces_missing(&handle);
    }
    Json(json!({"status": "OK", "result": [{
        "handle": handle, "rating": 3500, "maxRating": 3800,
        "rank": "legendary grandmaster", "maxRank": "legendary grandmaster",
        "friendOfCount": 10
    }]}))
    .into_response()
}

async fn codeforces_status(Query(q): Query<HashMap<String, String>>) -> Response {
    let handle = q.get("handle").cloned().unwrap_or_default();
    if handle == "ghost" {
        return codeforces_missing(&handle);
    }
    let t = now_secs();
    Json(json!({"status": "OK", "result": [
        {"id": 3, "creationTimeSeconds": t - 60, "problem": {"contestId": 1, "index": "A", "name": "Sum", "rating": 800},
         "programmingLanguage": "Rust 2021", "verdict": "OK"},
        {"id": 2, "creationTimeSeconds": t - 120, "problem": {"contestId": 1, "index": "A", "name": "Sum", "rating": 800},
         "programmingLanguage": "Rust 2021", "verdict": "WRONG_ANSWER"},
        {"id": 1, "creationTimeSeconds": t - 86400 * 3, "problem": {"contestId": 2, "index": "B", "name": "Max", "rating": 1500},
         "programmingLanguage": "GNU C++17", "verdict": "OK"}
    ]}))
    .into_response()
}

async fn codeforces_rating(Query(q): Query<HashMap<String, String>>) -> Response {
    let handle = q.get("handle").cloned().unwrap_or_default();
    if handle == "ghost" {
        return codeforces_missing(&handle);
    }
    Json(json!({"status": "OK", "result": [
        {"contestId": 1, "contestName": "Round 1", "rank": 1, "ratingUpdateTimeSeconds": 1690000000,
         "oldRating": 3400, "newRating": 3800},
        {"contestId": 2, "contestName": "Round 2", "rank": 40, "ratingUpdateTimeSeconds": 1695000000,
         "oldRating": 3800, "newRating": 3500}
    ]}))
    .into_response()
}

// ============ GitHub ============

async fn github_user(Path(user): Path<String>) -> Response {
    if user != "octocat" {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response();
    }
    Json(json!({"login": "octocat", "name": "The Octocat", "public_repos": 3, "followers": 10, "following": 1}))
        .into_response()
}

async fn github_repos(Path(_user): Path<String>) -> Json<Value> {
    Json(json!([
        {"name": "hello", "full_name": "octocat/hello", "stargazers_count": 7, "forks_count": 2,
         "language": "Rust", "fork": false, "updated_at": "2026-01-02T03:04:05Z"},
        {"name": "broken", "full_name": "octocat/broken", "stargazers_count": 3, "forks_count": 0,
         "language": "Go", "fork": false},
        {"name": "forked", "full_name": "octocat/forked", "stargazers_count": 100, "forks_count": 1,
         "language": null, "fork": true}
    ]))
}

async fn github_commits(Path((_owner, repo)): Path<(String, String)>) -> Response {
    if repo == "broken" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let now = Utc::now().to_rfc3339();
    Json(json!([
        {"sha": "aaa", "html_url": "https://example.com/aaa",
         "commit": {"message": "Add feature\n\nDetails", "author": {"date": now}}},
        {"sha": "bbb", "html_url": null,
         "commit": {"message": "Fix bug", "author": {"date": "2020-01-01T00:00:00Z"}}}
    ]))
    .into_response()
}

async fn github_languages(Path((_owner, repo)): Path<(String, String)>) -> Json<Value> {
    match repo.as_str() {
        "broken" => Json(json!({"Go": 900})),
        _ => Json(json!({"Rust": 5000, "Shell": 100})),
    }
}

// ============ Reddit ============

async fn reddit_about(Path(user): Path<String>, headers: HeaderMap) -> Response {
    let ua = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if ua != USER_AGENT {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(json!({"kind": "t2", "data": {
        "name": user, "link_karma": 1500, "comment_karma": -20, "created_utc": 1118030400.0
    }}))
    .into_response()
}

async fn reddit_submitted(Path(_user): Path<String>) -> Json<Value> {
    let t = now_secs() as f64;
    Json(json!({"kind": "Listing", "data": {"children": [
        {"kind": "t3", "data": {"id": "p1", "title": "Hello", "subreddit": "rust", "score": 12,
         "num_comments": 3, "created_utc": t - 30.0, "permalink": "/r/rust/p1"}},
        {"kind": "t3", "data": {"id": "p2", "title": "Again", "subreddit": "rust", "score": 40,
         "num_comments": 9, "created_utc": t - 90000.0, "permalink": "/r/rust/p2"}}
    ]}}))
}

async fn reddit_comments(Path(_user): Path<String>) -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

// ============ Gmail ============

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", GMAIL_TOKEN))
        .unwrap_or(false)
}

async fn gmail_profile(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({"emailAddress": "me@example.com", "messagesTotal": 5400, "threadsTotal": 3100}))
        .into_response()
}

async fn gmail_messages(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if q.contains_key("q") {
        return Json(json!({"messages": [{"id": "m1", "threadId": "t1"}], "resultSizeEstimate": 12}))
            .into_response();
    }
    Json(json!({"messages": [
        {"id": "m1", "threadId": "t1"},
        {"id": "m2", "threadId": "t2"},
        {"id": "missing", "threadId": "t3"}
    ], "resultSizeEstimate": 3}))
    .into_response()
}

async fn gmail_message(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let received = Utc::now().timestamp_millis();
    match id.as_str() {
        "m1" => Json(json!({
            "id": "m1", "snippet": "Standup moved", "labelIds": ["INBOX", "UNREAD", "IMPORTANT"],
            "internalDate": received.to_string(),
            "payload": {"headers": [{"name": "Subject", "value": "Standup"}, {"name": "From", "value": "lead@example.com"}]}
        }))
        .into_response(),
        "m2" => Json(json!({
            "id": "m2", "snippet": "Receipt", "labelIds": ["INBOX"],
            "internalDate": (received - 3_600_000).to_string(),
            "payload": {"headers": [{"name": "Subject", "value": "Your receipt"}, {"name": "From", "value": "shop@example.com"}]}
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
