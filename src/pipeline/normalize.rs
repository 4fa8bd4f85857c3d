//! Record normalizer — maps an inbound event into the canonical record.

use chrono::Utc;

use crate::pipeline::types::{ChatKind, InboundEvent, MessageRecord};
use crate::pipeline::urls::extract_urls;

/// Build a `MessageRecord` from an inbound event.
///
/// Infallible by construction: every attribute the session could not
/// resolve lands as `None`, and partial information never blocks record
/// creation. Performs no I/O and no logging.
pub fn normalize(event: &InboundEvent) -> MessageRecord {
    let text = event.text.clone().unwrap_or_default();
    // Computed once; both the record fields and the rule engine reuse them.
    let urls = extract_urls(&text);
    let has_urls = !urls.is_empty();
    let message_length = text.chars().count();

    let chat_type = event.chat.as_ref().map(|chat| match chat.broadcast {
        Some(true) => ChatKind::Channel,
        Some(false) => ChatKind::Group,
        None => ChatKind::Private,
    });

    MessageRecord {
        message_id: event.message_id,
        chat_id: event.chat_id,
        sender_id: event.sender_id,

        text,
        urls,
        has_urls,
        message_length,

        date: event.date,
        ingested_at: Utc::now(),

        chat_title: event.chat.as_ref().and_then(|c| c.title.clone()),
        chat_type,
        chat_username: event.chat.as_ref().and_then(|c| c.username.clone()),

        sender_username: event.sender.as_ref().and_then(|s| s.username.clone()),
        sender_first_name: event.sender.as_ref().and_then(|s| s.first_name.clone()),
        sender_last_name: event.sender.as_ref().and_then(|s| s.last_name.clone()),
        sender_phone: event.sender.as_ref().and_then(|s| s.phone.clone()),

        has_media: event.media.is_some(),
        media_type: event.media,
        reply_to_message_id: event.reply_to_message_id,
        forward: event.forward.clone(),

        analysis: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::pipeline::types::{ChatInfo, ForwardInfo, MediaKind, SenderInfo};

    fn bare_event() -> InboundEvent {
        InboundEvent {
            message_id: 100,
            chat_id: -200,
            sender_id: Some(300),
            text: None,
            date: Utc::now() - Duration::seconds(90),
            chat: None,
            sender: None,
            media: None,
            reply_to_message_id: None,
            forward: None,
        }
    }

    #[test]
    fn missing_text_defaults_to_empty() {
        let record = normalize(&bare_event());
        assert_eq!(record.text, "");
        assert!(record.urls.is_empty());
        assert!(!record.has_urls);
        assert_eq!(record.message_length, 0);
    }

    #[test]
    fn absent_optional_attributes_resolve_to_null() {
        let record = normalize(&bare_event());
        assert!(record.chat_title.is_none());
        assert!(record.chat_type.is_none());
        assert!(record.chat_username.is_none());
        assert!(record.sender_username.is_none());
        assert!(record.sender_first_name.is_none());
        assert!(record.sender_last_name.is_none());
        assert!(record.sender_phone.is_none());
        assert!(!record.has_media);
        assert!(record.media_type.is_none());
        assert!(record.reply_to_message_id.is_none());
        assert!(record.forward.is_none());
        assert!(record.analysis.is_none());
    }

    #[test]
    fn ingestion_timestamp_is_processing_time_not_origin() {
        let event = bare_event();
        let record = normalize(&event);
        assert_eq!(record.date, event.date);
        assert!(record.ingested_at > event.date);
    }

    #[test]
    fn urls_and_flag_are_consistent() {
        let mut event = bare_event();
        event.text = Some("check https://example.com and http://bit.ly/x".into());
        let record = normalize(&event);
        assert_eq!(record.urls, vec!["https://example.com", "http://bit.ly/x"]);
        assert!(record.has_urls);
    }

    #[test]
    fn message_length_counts_characters_not_bytes() {
        let mut event = bare_event();
        event.text = Some("héllo wörld".into());
        let record = normalize(&event);
        assert_eq!(record.message_length, 11);
    }

    #[test]
    fn broadcast_true_classifies_channel() {
        let mut event = bare_event();
        event.chat = Some(ChatInfo {
            title: Some("News".into()),
            username: Some("newsfeed".into()),
            broadcast: Some(true),
        });
        let record = normalize(&event);
        assert_eq!(record.chat_type, Some(ChatKind::Channel));
        assert_eq!(record.chat_title.as_deref(), Some("News"));
        assert_eq!(record.chat_username.as_deref(), Some("newsfeed"));
    }

    #[test]
    fn broadcast_false_classifies_group() {
        let mut event = bare_event();
        event.chat = Some(ChatInfo {
            broadcast: Some(false),
            ..Default::default()
        });
        assert_eq!(normalize(&event).chat_type, Some(ChatKind::Group));
    }

    #[test]
    fn missing_broadcast_flag_falls_through_to_private() {
        let mut event = bare_event();
        event.chat = Some(ChatInfo::default());
        assert_eq!(normalize(&event).chat_type, Some(ChatKind::Private));
    }

    #[test]
    fn sender_fields_are_carried_over() {
        let mut event = bare_event();
        event.sender = Some(SenderInfo {
            username: Some("alice_dev".into()),
            first_name: Some("Alice".into()),
            last_name: None,
            phone: None,
        });
        let record = normalize(&event);
        assert_eq!(record.sender_username.as_deref(), Some("alice_dev"));
        assert_eq!(record.sender_first_name.as_deref(), Some("Alice"));
        assert!(record.sender_last_name.is_none());
    }

    #[test]
    fn media_tag_is_recorded() {
        let mut event = bare_event();
        event.media = Some(MediaKind::Document);
        let record = normalize(&event);
        assert!(record.has_media);
        assert_eq!(record.media_type, Some(MediaKind::Document));
    }

    #[test]
    fn forward_descriptor_is_carried_over() {
        let mut event = bare_event();
        event.forward = Some(ForwardInfo {
            date: Some(Utc::now() - Duration::days(1)),
            from_id: Some(42),
            from_name: None,
        });
        let record = normalize(&event);
        let fwd = record.forward.expect("forward carried");
        assert_eq!(fwd.from_id, Some(42));
    }

    #[test]
    fn anonymous_sender_id_stays_null() {
        let mut event = bare_event();
        event.sender_id = None;
        assert!(normalize(&event).sender_id.is_none());
    }
}
