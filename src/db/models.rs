use serde::{Deserialize, Serialize};

/// An archived channel post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub source_message_id: i64,
    pub content: String,
    pub media_kind: String,
    pub category: String,
    /// Unix seconds, supplied by the source platform.
    pub event_time: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Post {
    #[must_use]
    pub fn media_kind_enum(&self) -> Option<MediaKind> {
        MediaKind::from_str(&self.media_kind)
    }
}

/// Structural type of a post's attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Sticker,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Sticker => "sticker",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "photo" => Some(Self::Photo),
            "video" => Some(Self::Video),
            "document" => Some(Self::Document),
            "audio" => Some(Self::Audio),
            "sticker" => Some(Self::Sticker),
            _ => None,
        }
    }
}

/// Normalized record for upserting a post, produced by the classifier.
///
/// `id`, `created_at` and `updated_at` are bookkeeping owned by storage and
/// are never supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub source_message_id: i64,
    pub content: String,
    pub media_kind: MediaKind,
    pub category: String,
    pub event_time: i64,
}

/// A distinct category with its row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub name: String,
    pub count: i64,
}
