//! Pure classification of inbound channel messages.
//!
//! Turns a raw message descriptor into a normalized record ready for
//! storage. Total: malformed or empty input degrades to `text`/`general`
//! rather than failing.

use serde::Deserialize;

use crate::db::{MediaKind, NewPost};

/// Raw message descriptor delivered by the messaging platform client.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub source_chat_id: i64,
    pub source_message_id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Unix seconds, when the message was posted.
    pub event_time: i64,
}

/// A media attachment descriptor carried by an inbound message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Attachment {
    Photo {
        #[serde(default)]
        width: Option<i64>,
        #[serde(default)]
        height: Option<i64>,
    },
    Video {
        #[serde(default)]
        duration_secs: Option<i64>,
    },
    Document {
        #[serde(default)]
        file_name: Option<String>,
        #[serde(default)]
        size_bytes: Option<i64>,
    },
    Audio {
        #[serde(default)]
        duration_secs: Option<i64>,
    },
    Voice {
        #[serde(default)]
        duration_secs: Option<i64>,
    },
    Animation {
        #[serde(default)]
        duration_secs: Option<i64>,
    },
    Sticker {
        #[serde(default)]
        emoji: Option<String>,
    },
}

/// An ordered keyword rule: the first rule whose keyword set intersects the
/// lower-cased content assigns the category.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    #[must_use]
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(ToString::to_string).collect(),
        }
    }
}

/// The default rule table. Order matters: earlier rules win.
#[must_use]
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("news", &["news", "update", "breaking"]),
        CategoryRule::new("announcement", &["announcement", "announcing", "attention"]),
        CategoryRule::new("quotes", &["quote", "quotes"]),
        CategoryRule::new("photos", &["photo", "picture", "pic"]),
        CategoryRule::new("videos", &["video", "clip", "watch"]),
    ]
}

/// Classify a raw message into a normalized record.
///
/// Deterministic and infallible: the same `(content, attachments)` input
/// always produces the same `(media_kind, category)`.
#[must_use]
pub fn classify(message: &InboundMessage, rules: &[CategoryRule]) -> NewPost {
    let media_kind = resolve_media_kind(&message.attachments);
    let content = resolve_content(message);
    let category = resolve_category(&content, media_kind, rules);

    NewPost {
        source_message_id: message.source_message_id,
        content,
        media_kind,
        category,
        event_time: message.event_time,
    }
}

/// First present attachment type wins, in fixed priority order: photo,
/// video, document, audio-or-voice, animation (treated as video), sticker.
/// No attachments means `text`.
fn resolve_media_kind(attachments: &[Attachment]) -> MediaKind {
    let any = |pred: fn(&Attachment) -> bool| attachments.iter().any(pred);

    if any(|a| matches!(a, Attachment::Photo { .. })) {
        MediaKind::Photo
    } else if any(|a| matches!(a, Attachment::Video { .. })) {
        MediaKind::Video
    } else if any(|a| matches!(a, Attachment::Document { .. })) {
        MediaKind::Document
    } else if any(|a| matches!(a, Attachment::Audio { .. } | Attachment::Voice { .. })) {
        MediaKind::Audio
    } else if any(|a| matches!(a, Attachment::Animation { .. })) {
        MediaKind::Video
    } else if any(|a| matches!(a, Attachment::Sticker { .. })) {
        MediaKind::Sticker
    } else {
        MediaKind::Text
    }
}

/// Text wins over caption; a bare sticker contributes its emoji. Pure-media
/// posts without any of these store empty content.
fn resolve_content(message: &InboundMessage) -> String {
    if let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) {
        return text.to_string();
    }
    if let Some(caption) = message.caption.as_deref().filter(|c| !c.is_empty()) {
        return caption.to_string();
    }
    message
        .attachments
        .iter()
        .find_map(|a| match a {
            Attachment::Sticker { emoji } => emoji.clone(),
            _ => None,
        })
        .unwrap_or_default()
}

fn resolve_category(content: &str, media_kind: MediaKind, rules: &[CategoryRule]) -> String {
    let lowered = content.to_lowercase();
    for rule in rules {
        if rule.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return rule.category.clone();
        }
    }
    if media_kind == MediaKind::Text {
        "general".to_string()
    } else {
        "media".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: Option<&str>, attachments: Vec<Attachment>) -> InboundMessage {
        InboundMessage {
            source_chat_id: -100,
            source_message_id: 1,
            text: text.map(ToString::to_string),
            caption: None,
            attachments,
            event_time: 1_700_000_000,
        }
    }

    #[test]
    fn no_attachments_is_text() {
        let record = classify(&message(Some("hello"), vec![]), &default_rules());
        assert_eq!(record.media_kind, MediaKind::Text);
    }

    #[test]
    fn photo_beats_video_in_priority() {
        let record = classify(
            &message(
                None,
                vec![
                    Attachment::Video {
                        duration_secs: Some(10),
                    },
                    Attachment::Photo {
                        width: None,
                        height: None,
                    },
                ],
            ),
            &default_rules(),
        );
        assert_eq!(record.media_kind, MediaKind::Photo);
    }

    #[test]
    fn animation_maps_to_video() {
        let record = classify(
            &message(
                None,
                vec![Attachment::Animation {
                    duration_secs: None,
                }],
            ),
            &default_rules(),
        );
        assert_eq!(record.media_kind, MediaKind::Video);
    }

    #[test]
    fn voice_maps_to_audio() {
        let record = classify(
            &message(None, vec![Attachment::Voice { duration_secs: None }]),
            &default_rules(),
        );
        assert_eq!(record.media_kind, MediaKind::Audio);
    }

    #[test]
    fn first_matching_rule_wins() {
        // "news" rule comes before "videos", so a video announcement about
        // news is still news.
        let record = classify(
            &message(Some("Breaking news: watch this video"), vec![]),
            &default_rules(),
        );
        assert_eq!(record.category, "news");
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let record = classify(&message(Some("BREAKING News today"), vec![]), &default_rules());
        assert_eq!(record.category, "news");
    }

    #[test]
    fn unmatched_text_defaults_to_general() {
        let record = classify(&message(Some("hello world"), vec![]), &default_rules());
        assert_eq!(record.category, "general");
        assert_eq!(record.media_kind, MediaKind::Text);
    }

    #[test]
    fn unmatched_media_defaults_to_media_category() {
        let record = classify(
            &message(
                None,
                vec![Attachment::Photo {
                    width: None,
                    height: None,
                }],
            ),
            &default_rules(),
        );
        assert_eq!(record.category, "media");
        assert_eq!(record.media_kind, MediaKind::Photo);
    }

    #[test]
    fn empty_message_degrades_conservatively() {
        let record = classify(&message(None, vec![]), &default_rules());
        assert_eq!(record.content, "");
        assert_eq!(record.media_kind, MediaKind::Text);
        assert_eq!(record.category, "general");
    }

    #[test]
    fn caption_used_when_text_absent() {
        let mut msg = message(None, vec![]);
        msg.caption = Some("photo of the sunset".to_string());
        let record = classify(&msg, &default_rules());
        assert_eq!(record.content, "photo of the sunset");
        assert_eq!(record.category, "photos");
    }

    #[test]
    fn sticker_emoji_becomes_content() {
        let record = classify(
            &message(
                None,
                vec![Attachment::Sticker {
                    emoji: Some("🔥".to_string()),
                }],
            ),
            &default_rules(),
        );
        assert_eq!(record.content, "🔥");
        assert_eq!(record.media_kind, MediaKind::Sticker);
        assert_eq!(record.category, "media");
    }

    #[test]
    fn classification_is_deterministic() {
        let msg = message(
            Some("Quote of the day"),
            vec![Attachment::Photo {
                width: Some(640),
                height: Some(480),
            }],
        );
        let first = classify(&msg, &default_rules());
        let second = classify(&msg, &default_rules());
        assert_eq!(first, second);
    }

    #[test]
    fn custom_rule_table_replaces_default() {
        let rules = vec![CategoryRule::new("important", &["urgent", "alert"])];
        let record = classify(&message(Some("urgent: read this"), vec![]), &rules);
        assert_eq!(record.category, "important");
    }

    #[test]
    fn attachment_descriptor_deserializes() {
        let json = r#"{
            "source_chat_id": -1001,
            "source_message_id": 7,
            "caption": "quarterly report",
            "attachments": [{"kind": "document", "file_name": "q3.pdf", "size_bytes": 1024}],
            "event_time": 1700000000
        }"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        let record = classify(&msg, &default_rules());
        assert_eq!(record.media_kind, MediaKind::Document);
        assert_eq!(record.content, "quarterly report");
    }
}
