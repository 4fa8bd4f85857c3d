//! Shared types for the message analysis pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

// ── Inbound event ───────────────────────────────────────────────────

/// A single inbound chat message plus its chat/sender/media context,
/// as delivered by the chat-session source.
///
/// Every field the session may fail to resolve is `Option` — the
/// normalizer maps absence to `null` on the record, never to an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Message id, unique within its source chat.
    pub message_id: i64,
    /// Chat id.
    pub chat_id: i64,
    /// Sender id. Absent for anonymous channel posts.
    pub sender_id: Option<i64>,
    /// Raw message text. Absent for media-only messages.
    pub text: Option<String>,
    /// When the message was sent (origin timestamp).
    pub date: DateTime<Utc>,
    /// Chat metadata, when the session could resolve it.
    pub chat: Option<ChatInfo>,
    /// Sender metadata, when the session could resolve it.
    pub sender: Option<SenderInfo>,
    /// Attached media, if any.
    pub media: Option<MediaKind>,
    /// Id of the message this one replies to.
    pub reply_to_message_id: Option<i64>,
    /// Forward descriptor, if this message was forwarded.
    pub forward: Option<ForwardInfo>,
}

/// Chat metadata off an inbound event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatInfo {
    pub title: Option<String>,
    pub username: Option<String>,
    /// Broadcast-capability flag: `Some(true)` for channels, `Some(false)`
    /// for groups. Chats that expose no such flag (private chats) carry `None`.
    pub broadcast: Option<bool>,
}

/// Sender metadata off an inbound event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderInfo {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Fixed vocabulary of attached-media kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    VideoNote,
    Document,
    Audio,
    Voice,
    Sticker,
    Animation,
    Contact,
    Location,
    Poll,
}

impl MediaKind {
    /// The discriminant tag stored on the record.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::VideoNote => "video_note",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Voice => "voice",
            Self::Sticker => "sticker",
            Self::Animation => "animation",
            Self::Contact => "contact",
            Self::Location => "location",
            Self::Poll => "poll",
        }
    }
}

/// Forward descriptor: where a forwarded message originally came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForwardInfo {
    /// When the original message was sent.
    pub date: Option<DateTime<Utc>>,
    /// Origin sender id, if the origin is visible.
    pub from_id: Option<i64>,
    /// Origin display name, for hidden-origin forwards.
    pub from_name: Option<String>,
}

// ── Canonical message record ────────────────────────────────────────

/// Three-way chat classification. Exhaustive — events whose chat exposes
/// no broadcast flag fall through to `Private`, never to an unknown bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Channel,
    Group,
    Private,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Group => "group",
            Self::Private => "private",
        }
    }
}

/// The normalized, storage-ready representation of one message.
///
/// Created once per inbound event, enriched exactly once by the rule
/// engine, then handed to the persistence collaborator. `analysis` is
/// either fully absent or fully populated — never partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    // Identity
    pub message_id: i64,
    pub chat_id: i64,
    pub sender_id: Option<i64>,

    // Content
    pub text: String,
    /// Extracted URLs, in order of first appearance. Duplicates kept,
    /// no canonical form guaranteed.
    pub urls: Vec<String>,
    pub has_urls: bool,
    /// Text length in characters (not bytes).
    pub message_length: usize,

    // Timestamps
    /// When the message was sent.
    pub date: DateTime<Utc>,
    /// When this pipeline processed it. Always the processing wall-clock
    /// time, never copied from `date`.
    pub ingested_at: DateTime<Utc>,

    // Chat context
    pub chat_title: Option<String>,
    pub chat_type: Option<ChatKind>,
    pub chat_username: Option<String>,

    // Sender context
    pub sender_username: Option<String>,
    pub sender_first_name: Option<String>,
    pub sender_last_name: Option<String>,
    pub sender_phone: Option<String>,

    // Media / threading context
    pub has_media: bool,
    pub media_type: Option<MediaKind>,
    pub reply_to_message_id: Option<i64>,
    pub forward: Option<ForwardInfo>,

    /// Risk assessment, populated by the rule engine before persistence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<RiskAssessment>,
}

// ── Risk assessment ─────────────────────────────────────────────────

/// Classification label. Two-valued for now; `phishing`/`unknown` are
/// reserved for a future model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    Spam,
    NoSpam,
}

impl RiskLabel {
    /// Short label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::NoSpam => "no_spam",
        }
    }
}

/// Output of the rule engine, merged into `MessageRecord::analysis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub label: RiskLabel,
    /// True iff any rule fired.
    pub is_suspicious: bool,
    /// Sum of per-rule contributions. Never decreases once computed.
    pub risk_score: u32,
    /// One entry per fired rule category, in evaluation order.
    pub reasons: Vec<String>,
    /// Reserved for a future model. Always `None` in this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<serde_json::Value>,
    /// When the assessment was computed.
    pub analysis_timestamp: DateTime<Utc>,
}

// ── Event source trait ──────────────────────────────────────────────

/// Stream of inbound events from a chat session.
pub type EventStream = std::pin::Pin<Box<dyn futures::Stream<Item = InboundEvent> + Send>>;

/// Trait for chat-session sources — pure I/O, no analysis logic.
///
/// The pipeline only reads attributes off each delivered event; it never
/// calls back into the session.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Source name (e.g. "telegram").
    fn name(&self) -> &str;

    /// Verify the session is reachable before entering the ingest loop.
    async fn health_check(&self) -> Result<(), ChannelError>;

    /// Begin delivering inbound events.
    async fn start(&self) -> Result<EventStream, ChannelError>;
}
