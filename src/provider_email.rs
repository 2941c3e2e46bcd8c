//! Email provider backed by the Gmail REST API.
//!
//! Requires an OAuth2 access token in the environment variable named by
//! `providers.email.access_token_env`. Without one the provider fails with
//! [`ProviderError::NotConfigured`] before touching the network.
//!
//! The identity is the expected mailbox address. Gmail always answers for
//! the token's own mailbox (`users/me`), so a mismatch is logged but not
//! treated as an error.

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use taskflow_core::models::{EmailStats, EmailSummary, RECENT_ITEMS_CAP};
use taskflow_core::{DataOrigin, Provider, ProviderStats};

use crate::config::EmailConfig;
use crate::error::{ProviderError, Result};
use crate::http::{endpoint, HttpClient};
use crate::normalize::{clamp_u32, clamp_u64, from_unix_millis};
use crate::traits::{require_identity, StatsProvider};

const RECENT_PAGE: &str = "10";

pub struct EmailProvider {
    http: HttpClient,
    config: EmailConfig,
}

impl EmailProvider {
    pub fn new(http: HttpClient, config: EmailConfig) -> Self {
        Self { http, config }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut path = vec!["users", "me"];
        path.extend_from_slice(segments);
        let url = endpoint(&self.config.base_url, &path)?;
        let auth = format!("Bearer {}", token);
        self.http
            .get_json(url, query, &[("Authorization", auth.as_str())])
            .await
    }

    async fn message(&self, token: &str, id: &str) -> Option<Message> {
        let query = [
            ("format", "metadata"),
            ("metadataHeaders", "Subject"),
            ("metadataHeaders", "From"),
        ];
        match self.get::<Message>(token, &["messages", id], &query).await {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(message = id, error = %e, "skipping message");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
    #[serde(default)]
    messages_total: i64,
    #[serde(default)]
    threads_total: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(default)]
    result_size_estimate: i64,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    label_ids: Vec<String>,
    /// Milliseconds since the epoch, sent as a string.
    #[serde(default)]
    internal_date: String,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

impl Message {
    fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn has_label(&self, label: &str) -> bool {
        self.label_ids.iter().any(|l| l == label)
    }

    fn summary(&self) -> Option<EmailSummary> {
        let millis: i64 = self.internal_date.trim().parse().ok()?;
        Some(EmailSummary {
            id: self.id.clone(),
            subject: self.header("Subject").unwrap_or("(no subject)").to_string(),
            from: self.header("From").unwrap_or_default().to_string(),
            snippet: self.snippet.clone(),
            received_at: from_unix_millis(millis)?,
            is_unread: self.has_label("UNREAD"),
            is_important: self.has_label("IMPORTANT"),
        })
    }
}

#[async_trait]
impl StatsProvider for EmailProvider {
    fn provider(&self) -> Provider {
        Provider::Email
    }

    fn description(&self) -> &str {
        "Gmail mailbox totals, unread count, and recent messages"
    }

    // Profile and message lists, then each message's metadata
    fn round_trips(&self) -> u32 {
        2
    }

    async fn fetch_stats(&self, identity: &str) -> Result<ProviderStats> {
        let address = require_identity(identity)?;
        let token = self.config.access_token().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "set {} to a Gmail access token",
                self.config.access_token_env
            ))
        })?;

        let unread_query = [("q", "is:unread"), ("maxResults", "1")];
        let recent_query = [("maxResults", RECENT_PAGE)];
        let (profile, unread, recent) = tokio::try_join!(
            self.get::<Profile>(&token, &["profile"], &[]),
            self.get::<MessageList>(&token, &["messages"], &unread_query),
            self.get::<MessageList>(&token, &["messages"], &recent_query),
        )?;

        if !profile.email_address.eq_ignore_ascii_case(address) {
            warn!(expected = address, actual = %profile.email_address, "token belongs to a different mailbox");
        }
        debug!(messages = recent.messages.len(), "gmail recent messages");

        let messages: Vec<Message> = join_all(
            recent
                .messages
                .iter()
                .take(RECENT_ITEMS_CAP)
                .map(|m| self.message(&token, &m.id)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        Ok(ProviderStats::Email(normalize(
            profile,
            unread.result_size_estimate,
            &messages,
        )))
    }
}

fn normalize(profile: Profile, unread_estimate: i64, messages: &[Message]) -> EmailStats {
    let mut recent_emails: Vec<EmailSummary> = messages.iter().filter_map(Message::summary).collect();
    recent_emails.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    recent_emails.truncate(RECENT_ITEMS_CAP);

    EmailStats {
        email: profile.email_address,
        total_messages: clamp_u64(profile.messages_total),
        total_threads: clamp_u64(profile.threads_total),
        unread_count: clamp_u32(unread_estimate),
        recent_emails,
        origin: DataOrigin::Live,
    }
}
