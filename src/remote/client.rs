//! HTTP adapter for a Slack-shaped messaging REST surface.
//!
//! Encapsulates all remote API interactions with retry logic and error
//! handling. Responses are parsed leniently: unknown fields are ignored and
//! malformed history entries are skipped rather than failing the page.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{Value, json};
use tokio_retry::strategy::jitter;
use tokio_retry::{Retry, strategy::ExponentialBackoff};
use tracing::warn;

use super::MessageSource;
use crate::core::models::{Attachment, Channel, Message, MessagePage, Reaction, UserInfo};
use crate::errors::SyncError;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Remote message source speaking the Slack REST conventions
/// (`conversations.*`, `users.info`, `chat.postMessage`, `reactions.*`).
pub struct HttpMessageSource {
    token: String,
    base_url: String,
    page_size: u32,
}

impl HttpMessageSource {
    #[must_use]
    pub fn new(token: String, base_url: String, page_size: u32) -> Self {
        Self {
            token,
            base_url,
            page_size,
        }
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, SyncError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);

        Retry::spawn(strategy, operation).await
    }

    /// POST a JSON payload to `<base_url>/<method>`, check the HTTP status
    /// and the body's `ok` field, and return the parsed body.
    async fn api_post(&self, method: &str, payload: &Value) -> Result<Value, SyncError> {
        let url = format!("{}/{}", self.base_url, method);

        let resp = HTTP_CLIENT
            .post(&url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| SyncError::HttpError(format!("{method} request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(SyncError::ApiError(format!(
                "{method} HTTP {}",
                resp.status()
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| SyncError::ParseError(format!("{method} JSON parse error: {e}")))?;

        if !body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            return Err(SyncError::ApiError(format!(
                "{method} error: {}",
                body.get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl MessageSource for HttpMessageSource {
    async fn get_channels(&self) -> Result<Vec<Channel>, SyncError> {
        self.with_retry(|| async {
            let payload = json!({
                "types": "public_channel,private_channel",
                "exclude_archived": true,
                "limit": 200,
            });

            let body = self.api_post("conversations.list", &payload).await?;

            let channels = body
                .get("channels")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(parse_channel).collect())
                .unwrap_or_default();

            Ok(channels)
        })
        .await
    }

    async fn join_channel(&self, channel_id: &str) -> Result<bool, SyncError> {
        let payload = json!({ "channel": channel_id });

        match self.api_post("conversations.join", &payload).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Failed to join channel {}: {}", channel_id, e);
                Ok(false)
            }
        }
    }

    async fn get_messages(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage, SyncError> {
        self.with_retry(|| async {
            let mut payload = json!({
                "channel": channel_id,
                "limit": self.page_size,
            });

            if let Some(token) = cursor {
                payload["cursor"] = Value::String(token.to_string());
            }

            let body = self.api_post("conversations.history", &payload).await?;

            Ok(parse_history_page(channel_id, &body))
        })
        .await
    }

    async fn get_user_info(&self, user_id: &str) -> Result<UserInfo, SyncError> {
        self.with_retry(|| async {
            let payload = json!({ "user": user_id });

            let body = self.api_post("users.info", &payload).await?;

            let profile = body.get("user").and_then(|u| u.get("profile"));
            let display_name = profile
                .and_then(|p| p.get("real_name").and_then(Value::as_str))
                .or_else(|| profile.and_then(|p| p.get("display_name").and_then(Value::as_str)))
                .filter(|name| !name.is_empty())
                .unwrap_or(user_id)
                .to_string();
            let avatar_url = profile
                .and_then(|p| p.get("image_192").and_then(Value::as_str))
                .map(std::string::ToString::to_string);

            Ok(UserInfo {
                display_name,
                avatar_url,
            })
        })
        .await
    }

    async fn current_user_id(&self) -> Result<String, SyncError> {
        self.with_retry(|| async {
            let body = self.api_post("auth.test", &json!({})).await?;

            body.get("user_id")
                .and_then(Value::as_str)
                .map(std::string::ToString::to_string)
                .ok_or_else(|| SyncError::ParseError("auth.test: no user_id".to_string()))
        })
        .await
    }

    async fn send_message(
        &self,
        text: &str,
        channel_id: &str,
        thread_parent_id: Option<&str>,
    ) -> Result<String, SyncError> {
        let mut payload = json!({
            "channel": channel_id,
            "text": text,
        });

        if let Some(parent_id) = thread_parent_id {
            payload["thread_ts"] = Value::String(remote_ts(parent_id).to_string());
        }

        let body = self.api_post("chat.postMessage", &payload).await?;

        let ts = body
            .get("ts")
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::ParseError("chat.postMessage: no ts".to_string()))?;

        Ok(message_id(channel_id, ts))
    }

    async fn add_reaction(
        &self,
        name: &str,
        channel_id: &str,
        message_id: &str,
    ) -> Result<bool, SyncError> {
        let payload = json!({
            "channel": channel_id,
            "name": name,
            "timestamp": remote_ts(message_id),
        });

        self.api_post("reactions.add", &payload).await?;
        Ok(true)
    }

    async fn remove_reaction(
        &self,
        name: &str,
        channel_id: &str,
        message_id: &str,
    ) -> Result<bool, SyncError> {
        let payload = json!({
            "channel": channel_id,
            "name": name,
            "timestamp": remote_ts(message_id),
        });

        self.api_post("reactions.remove", &payload).await?;
        Ok(true)
    }
}

/// Feed-local message id. Remote timestamps are only unique per channel, so
/// ids are qualified with the channel id.
fn message_id(channel_id: &str, ts: &str) -> String {
    format!("{channel_id}:{ts}")
}

/// The remote-side timestamp component of a feed-local message id.
fn remote_ts(message_id: &str) -> &str {
    message_id.rsplit(':').next().unwrap_or(message_id)
}

fn parse_channel(value: &Value) -> Option<Channel> {
    Some(Channel {
        id: value.get("id")?.as_str()?.to_string(),
        name: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        is_member: value
            .get("is_member")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn parse_history_page(channel_id: &str, body: &Value) -> MessagePage {
    let messages = body
        .get("messages")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|m| parse_message(channel_id, m))
                .collect()
        })
        .unwrap_or_default();

    let next_cursor = body
        .get("response_metadata")
        .and_then(|m| m.get("next_cursor"))
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(std::string::ToString::to_string);

    let has_more = body
        .get("has_more")
        .and_then(Value::as_bool)
        .unwrap_or(next_cursor.is_some());

    MessagePage {
        messages,
        next_cursor,
        has_more,
    }
}

fn parse_message(channel_id: &str, value: &Value) -> Option<Message> {
    let ts = value.get("ts")?.as_str()?;
    let author_id = value
        .get("user")
        .and_then(Value::as_str)
        .or_else(|| value.get("bot_id").and_then(Value::as_str))?
        .to_string();
    let timestamp = parse_ts(ts)?;

    let thread_ts = value.get("thread_ts").and_then(Value::as_str);
    let reply_count = value
        .get("reply_count")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;

    let reactions = value
        .get("reactions")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_reaction).collect())
        .unwrap_or_default();

    let attachments = value
        .get("files")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_attachment).collect())
        .unwrap_or_default();

    Some(Message {
        id: message_id(channel_id, ts),
        channel_id: channel_id.to_string(),
        // Display name is resolved lazily; the raw id is the placeholder.
        author_display_name: author_id.clone(),
        author_id,
        author_avatar_url: None,
        text: value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        timestamp,
        is_read: false,
        attachments,
        thread_parent_id: thread_ts
            .filter(|parent| *parent != ts)
            .map(|parent| message_id(channel_id, parent)),
        is_thread_parent: reply_count > 0,
        reply_count,
        reactions,
    })
}

fn parse_reaction(value: &Value) -> Option<Reaction> {
    Some(Reaction {
        name: value.get("name")?.as_str()?.to_string(),
        count: value.get("count").and_then(Value::as_u64).unwrap_or(0) as u32,
        reactor_ids: value
            .get("users")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(std::string::ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    })
}

fn parse_attachment(value: &Value) -> Option<Attachment> {
    Some(Attachment {
        title: value
            .get("title")
            .and_then(Value::as_str)
            .map(std::string::ToString::to_string),
        url: value
            .get("url_private")
            .or_else(|| value.get("permalink"))?
            .as_str()?
            .to_string(),
    })
}

/// Parse a `seconds.fraction` remote timestamp into UTC time.
fn parse_ts(ts: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = ts.parse().ok()?;
    let secs = seconds.trunc() as i64;
    let nanos = (seconds.fract() * 1_000_000_000.0).round() as u32;
    DateTime::from_timestamp(secs, nanos)
}

#[cfg(test)]
mod parsing_tests {
    use super::*;

    #[test]
    fn test_parse_history_page_full() {
        let body = json!({
            "ok": true,
            "messages": [
                {
                    "ts": "1721609600.000100",
                    "user": "U111",
                    "text": "hello",
                    "reply_count": 2,
                    "thread_ts": "1721609600.000100",
                    "reactions": [
                        { "name": "thumbsup", "count": 2, "users": ["U111", "U222"] }
                    ]
                },
                {
                    "ts": "1721609500.000100",
                    "user": "U222",
                    "text": "reply",
                    "thread_ts": "1721609600.000100"
                }
            ],
            "has_more": true,
            "response_metadata": { "next_cursor": "bmV4dA==" }
        });

        let page = parse_history_page("C1", &body);

        assert_eq!(page.messages.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("bmV4dA=="));

        let parent = &page.messages[0];
        assert_eq!(parent.id, "C1:1721609600.000100");
        assert!(parent.is_thread_parent);
        // A message whose thread_ts equals its own ts is the parent, not a child.
        assert!(parent.thread_parent_id.is_none());
        assert_eq!(parent.reactions[0].reactor_ids, vec!["U111", "U222"]);

        let child = &page.messages[1];
        assert_eq!(child.thread_parent_id.as_deref(), Some("C1:1721609600.000100"));
        assert!(!child.is_thread_parent);
    }

    #[test]
    fn test_parse_message_placeholder_author_and_unread() {
        let value = json!({ "ts": "1721609600.000100", "user": "U111", "text": "hi" });
        let msg = parse_message("C1", &value).unwrap();

        assert_eq!(msg.author_display_name, "U111");
        assert!(msg.author_unresolved());
        assert!(!msg.is_read);
    }

    #[test]
    fn test_parse_message_skips_entries_without_ts_or_author() {
        assert!(parse_message("C1", &json!({ "user": "U1", "text": "x" })).is_none());
        assert!(parse_message("C1", &json!({ "ts": "170.0", "text": "x" })).is_none());
    }

    #[test]
    fn test_parse_history_page_empty_cursor_means_no_more() {
        let body = json!({
            "ok": true,
            "messages": [],
            "has_more": false,
            "response_metadata": { "next_cursor": "" }
        });

        let page = parse_history_page("C1", &body);
        assert!(page.next_cursor.is_none());
        assert!(!page.has_more);
    }

    #[test]
    fn test_remote_ts_strips_channel_prefix() {
        assert_eq!(remote_ts("C1:1721609600.000100"), "1721609600.000100");
        assert_eq!(remote_ts("1721609600.000100"), "1721609600.000100");
    }

    #[test]
    fn test_parse_ts_fractional() {
        let dt = parse_ts("1721609600.500000").unwrap();
        assert_eq!(dt.timestamp(), 1_721_609_600);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }
}
