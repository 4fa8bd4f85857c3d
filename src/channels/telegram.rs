//! Telegram session source — long-polls the Bot API for updates.
//!
//! Converts each `message`/`channel_post` update into an `InboundEvent`
//! via the pure `parse_update` function; the pipeline never sees Bot API
//! JSON. Transient poll/parse errors are logged and retried.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::error::ChannelError;
use crate::pipeline::types::{
    ChatInfo, EventSource, EventStream, ForwardInfo, InboundEvent, MediaKind, SenderInfo,
};

/// Long-poll timeout passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Backoff after a failed poll round.
const POLL_RETRY_SECS: u64 = 5;

/// Telegram session — connects to the Bot API via long-polling.
pub struct TelegramSession {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramSession {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }
}

#[async_trait]
impl EventSource for TelegramSession {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let poll_url = self.api_url("getUpdates");
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram session listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "channel_post"]
                });

                let resp = match client.post(&poll_url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(POLL_RETRY_SECS)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(POLL_RETRY_SECS)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in results {
                        // Advance offset past this update
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }

                        let Some(event) = parse_update(update) else {
                            continue;
                        };

                        if tx.send(event).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }
}

// ── Update parsing ──────────────────────────────────────────────────

/// Convert one Bot API update into an `InboundEvent`.
///
/// Returns `None` for update kinds the pipeline doesn't ingest. Every
/// optional attribute resolves to `None` rather than failing the parse.
pub fn parse_update(update: &serde_json::Value) -> Option<InboundEvent> {
    let message = update.get("message").or_else(|| update.get("channel_post"))?;

    let message_id = message.get("message_id")?.as_i64()?;
    let chat = message.get("chat")?;
    let chat_id = chat.get("id")?.as_i64()?;

    let date = message
        .get("date")
        .and_then(serde_json::Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    // Text body, or the caption for media messages
    let text = message
        .get("text")
        .or_else(|| message.get("caption"))
        .and_then(serde_json::Value::as_str)
        .map(String::from);

    let sender = message.get("from");
    let sender_id = sender
        .and_then(|f| f.get("id"))
        .and_then(serde_json::Value::as_i64);

    Some(InboundEvent {
        message_id,
        chat_id,
        sender_id,
        text,
        date,
        chat: Some(parse_chat(chat)),
        sender: sender.map(parse_sender),
        media: detect_media(message),
        reply_to_message_id: message
            .get("reply_to_message")
            .and_then(|r| r.get("message_id"))
            .and_then(serde_json::Value::as_i64),
        forward: parse_forward(message),
    })
}

/// Map the Bot API chat object onto the broadcast tri-state.
///
/// `channel` chats are broadcast-capable; `group`/`supergroup` expose the
/// flag as false; `private` chats carry no flag at all.
fn parse_chat(chat: &serde_json::Value) -> ChatInfo {
    let broadcast = match chat.get("type").and_then(serde_json::Value::as_str) {
        Some("channel") => Some(true),
        Some("group") | Some("supergroup") => Some(false),
        _ => None,
    };

    ChatInfo {
        title: json_str(chat, "title"),
        username: json_str(chat, "username"),
        broadcast,
    }
}

fn parse_sender(from: &serde_json::Value) -> SenderInfo {
    SenderInfo {
        username: json_str(from, "username"),
        first_name: json_str(from, "first_name"),
        last_name: json_str(from, "last_name"),
        // Bot API never exposes phone numbers for message senders
        phone: None,
    }
}

/// Detect the attached media kind from the update's discriminant keys.
fn detect_media(message: &serde_json::Value) -> Option<MediaKind> {
    const MEDIA_KEYS: &[(&str, MediaKind)] = &[
        ("photo", MediaKind::Photo),
        ("video", MediaKind::Video),
        ("video_note", MediaKind::VideoNote),
        ("document", MediaKind::Document),
        ("audio", MediaKind::Audio),
        ("voice", MediaKind::Voice),
        ("sticker", MediaKind::Sticker),
        ("animation", MediaKind::Animation),
        ("contact", MediaKind::Contact),
        ("location", MediaKind::Location),
        ("poll", MediaKind::Poll),
    ];

    MEDIA_KEYS
        .iter()
        .find(|(key, _)| message.get(*key).is_some())
        .map(|(_, kind)| *kind)
}

fn parse_forward(message: &serde_json::Value) -> Option<ForwardInfo> {
    let forward_date = message
        .get("forward_date")
        .and_then(serde_json::Value::as_i64);
    let forward_from = message.get("forward_from");
    let forward_sender_name = json_str(message, "forward_sender_name");

    if forward_date.is_none() && forward_from.is_none() && forward_sender_name.is_none() {
        return None;
    }

    Some(ForwardInfo {
        date: forward_date.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        from_id: forward_from
            .and_then(|f| f.get("id"))
            .and_then(serde_json::Value::as_i64),
        from_name: forward_from
            .and_then(|f| f.get("first_name"))
            .and_then(serde_json::Value::as_str)
            .map(String::from)
            .or(forward_sender_name),
    })
}

fn json_str(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(String::from)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_name() {
        let session = TelegramSession::new(SecretString::from("fake-token"));
        assert_eq!(session.name(), "telegram");
    }

    #[test]
    fn api_url_embeds_token() {
        let session = TelegramSession::new(SecretString::from("123:ABC"));
        assert_eq!(
            session.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[test]
    fn parses_private_text_message() {
        let update = json!({
            "update_id": 10,
            "message": {
                "message_id": 42,
                "date": 1700000000,
                "text": "hello there",
                "chat": {"id": 555, "type": "private", "username": "alice_dev"},
                "from": {"id": 555, "username": "alice_dev", "first_name": "Alice"}
            }
        });

        let event = parse_update(&update).expect("parsed");
        assert_eq!(event.message_id, 42);
        assert_eq!(event.chat_id, 555);
        assert_eq!(event.sender_id, Some(555));
        assert_eq!(event.text.as_deref(), Some("hello there"));
        assert_eq!(event.date.timestamp(), 1_700_000_000);

        let chat = event.chat.expect("chat info");
        assert_eq!(chat.broadcast, None);
        assert_eq!(chat.username.as_deref(), Some("alice_dev"));

        let sender = event.sender.expect("sender info");
        assert_eq!(sender.first_name.as_deref(), Some("Alice"));
        assert!(sender.phone.is_none());
    }

    #[test]
    fn group_and_supergroup_expose_broadcast_false() {
        for kind in ["group", "supergroup"] {
            let update = json!({
                "message": {
                    "message_id": 1,
                    "date": 1700000000,
                    "text": "hi",
                    "chat": {"id": -100, "type": kind, "title": "Team"}
                }
            });
            let event = parse_update(&update).unwrap();
            assert_eq!(event.chat.unwrap().broadcast, Some(false), "kind {kind}");
        }
    }

    #[test]
    fn channel_post_is_broadcast_and_anonymous() {
        let update = json!({
            "channel_post": {
                "message_id": 7,
                "date": 1700000000,
                "text": "announcement",
                "chat": {"id": -1009, "type": "channel", "title": "News"}
            }
        });

        let event = parse_update(&update).unwrap();
        assert_eq!(event.chat.as_ref().unwrap().broadcast, Some(true));
        assert!(event.sender_id.is_none());
        assert!(event.sender.is_none());
    }

    #[test]
    fn media_message_uses_caption_as_text() {
        let update = json!({
            "message": {
                "message_id": 3,
                "date": 1700000000,
                "caption": "look at this",
                "photo": [{"file_id": "abc"}],
                "chat": {"id": 1, "type": "private"},
                "from": {"id": 2}
            }
        });

        let event = parse_update(&update).unwrap();
        assert_eq!(event.text.as_deref(), Some("look at this"));
        assert_eq!(event.media, Some(MediaKind::Photo));
    }

    #[test]
    fn media_only_message_has_no_text() {
        let update = json!({
            "message": {
                "message_id": 4,
                "date": 1700000000,
                "voice": {"file_id": "v1"},
                "chat": {"id": 1, "type": "private"},
                "from": {"id": 2}
            }
        });

        let event = parse_update(&update).unwrap();
        assert!(event.text.is_none());
        assert_eq!(event.media, Some(MediaKind::Voice));
    }

    #[test]
    fn reply_reference_is_extracted() {
        let update = json!({
            "message": {
                "message_id": 5,
                "date": 1700000000,
                "text": "agreed",
                "reply_to_message": {"message_id": 4},
                "chat": {"id": 1, "type": "private"},
                "from": {"id": 2}
            }
        });

        let event = parse_update(&update).unwrap();
        assert_eq!(event.reply_to_message_id, Some(4));
    }

    #[test]
    fn forward_from_visible_origin() {
        let update = json!({
            "message": {
                "message_id": 6,
                "date": 1700000100,
                "text": "fwd",
                "forward_date": 1700000000,
                "forward_from": {"id": 99, "first_name": "Bob"},
                "chat": {"id": 1, "type": "private"},
                "from": {"id": 2}
            }
        });

        let event = parse_update(&update).unwrap();
        let forward = event.forward.expect("forward info");
        assert_eq!(forward.from_id, Some(99));
        assert_eq!(forward.from_name.as_deref(), Some("Bob"));
        assert_eq!(forward.date.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn forward_from_hidden_origin_keeps_name_only() {
        let update = json!({
            "message": {
                "message_id": 6,
                "date": 1700000100,
                "text": "fwd",
                "forward_date": 1700000000,
                "forward_sender_name": "Hidden User",
                "chat": {"id": 1, "type": "private"},
                "from": {"id": 2}
            }
        });

        let event = parse_update(&update).unwrap();
        let forward = event.forward.expect("forward info");
        assert!(forward.from_id.is_none());
        assert_eq!(forward.from_name.as_deref(), Some("Hidden User"));
    }

    #[test]
    fn non_forward_message_has_no_forward_info() {
        let update = json!({
            "message": {
                "message_id": 8,
                "date": 1700000000,
                "text": "plain",
                "chat": {"id": 1, "type": "private"},
                "from": {"id": 2}
            }
        });
        assert!(parse_update(&update).unwrap().forward.is_none());
    }

    #[test]
    fn unsupported_update_kinds_are_skipped() {
        let update = json!({
            "update_id": 11,
            "edited_message": {
                "message_id": 9,
                "date": 1700000000,
                "text": "edited",
                "chat": {"id": 1, "type": "private"}
            }
        });
        assert!(parse_update(&update).is_none());
    }

    #[test]
    fn malformed_update_is_skipped_not_fatal() {
        assert!(parse_update(&json!({})).is_none());
        assert!(parse_update(&json!({"message": {}})).is_none());
        assert!(parse_update(&json!({"message": {"message_id": 1}})).is_none());
    }
}
