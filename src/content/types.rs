//! Content types and projections
//!
//! Preview projections are separate types that simply have no field for the
//! protected payload, so a list path cannot carry `content` or `videoUrl`
//! even by accident.

use crate::content::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content catalog a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Video,
}

impl ContentType {
    /// Singular name (`article`, `video`)
    pub const fn as_str(&self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Video => "video",
        }
    }

    /// Plural name, used for usage-record keys and default collection names
    pub const fn plural(&self) -> &'static str {
        match self {
            ContentType::Article => "articles",
            ContentType::Video => "videos",
        }
    }

    /// Name of the field that only full projections carry
    pub const fn protected_field(&self) -> &'static str {
        match self {
            ContentType::Article => "content",
            ContentType::Video => "videoUrl",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "article" | "articles" => Some(ContentType::Article),
            "video" | "videos" => Some(ContentType::Video),
            _ => None,
        }
    }

    pub const fn all() -> &'static [ContentType] {
        &[ContentType::Article, ContentType::Video]
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// List-view projection of an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePreview {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub preview: String,
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// Full article including the protected body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(flatten)]
    pub summary: ArticlePreview,
    pub content: String,
}

/// List-view projection of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPreview {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Length in seconds
    #[serde(default)]
    pub duration: Option<u32>,
}

/// Full video including the protected stream URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(flatten)]
    pub summary: VideoPreview,
    pub video_url: String,
}

/// Redacted projection returned by list views
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PreviewProjection {
    Article(ArticlePreview),
    Video(VideoPreview),
}

impl PreviewProjection {
    pub fn id(&self) -> &str {
        match self {
            PreviewProjection::Article(a) => &a.id,
            PreviewProjection::Video(v) => &v.id,
        }
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PreviewProjection::Article(a) => a.published_at,
            PreviewProjection::Video(v) => v.published_at,
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            PreviewProjection::Article(_) => ContentType::Article,
            PreviewProjection::Video(_) => ContentType::Video,
        }
    }
}

/// Full projection returned by detail views
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FullProjection {
    Article(Article),
    Video(Video),
}

impl FullProjection {
    pub fn id(&self) -> &str {
        match self {
            FullProjection::Article(a) => &a.summary.id,
            FullProjection::Video(v) => &v.summary.id,
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            FullProjection::Article(_) => ContentType::Article,
            FullProjection::Video(_) => ContentType::Video,
        }
    }
}
