//! Feed-domain types: video records, pages, filters, and source tiers.
//!
//! Records are deserialized straight from backend rows and never mutated
//! afterwards. Optional source fields may arrive as `null`, missing, or an
//! empty string; the accessor methods fold all three into `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{UserId, VideoId};

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Candidate playback source class, ordered by preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// URL built on the fly by the transcoding service from an asset id.
    Transformed,
    /// Pre-optimized file produced server-side after upload.
    Optimized,
    /// Adaptive streaming manifest.
    Stream,
    /// The unmodified upload.
    Original,
}

impl Tier {
    /// All tiers, highest preference first.
    pub const ALL: [Tier; 4] = [Tier::Transformed, Tier::Optimized, Tier::Stream, Tier::Original];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transformed => write!(f, "transformed"),
            Self::Optimized => write!(f, "optimized"),
            Self::Stream => write!(f, "stream"),
            Self::Original => write!(f, "original"),
        }
    }
}

// ---------------------------------------------------------------------------
// VideoRecord
// ---------------------------------------------------------------------------

/// Display-only engagement counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementCounters {
    pub likes_count: u64,
    pub comments_count: u64,
    pub shares_count: u64,
    pub views_count: u64,
}

/// Immutable description of one video in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: VideoId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub caption: Option<String>,
    /// Original upload URL; always present.
    pub video_url: String,
    /// Transcoding-service asset id.
    #[serde(default, alias = "public_id")]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub optimized_url: Option<String>,
    /// Streaming manifest (HLS) URL.
    #[serde(default, alias = "hls_url")]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub optimized_thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub counters: EngagementCounters,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl VideoRecord {
    /// Minimal record with only an original upload URL.
    pub fn new(id: VideoId, video_url: impl Into<String>) -> Self {
        Self {
            id,
            user_id: None,
            caption: None,
            video_url: video_url.into(),
            asset_id: None,
            optimized_url: None,
            stream_url: None,
            thumbnail_url: None,
            optimized_thumbnail_url: None,
            tags: Vec::new(),
            counters: EngagementCounters::default(),
            created_at: None,
        }
    }

    pub fn asset_id(&self) -> Option<&str> {
        present(&self.asset_id)
    }

    pub fn optimized_url(&self) -> Option<&str> {
        present(&self.optimized_url)
    }

    pub fn stream_url(&self) -> Option<&str> {
        present(&self.stream_url)
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        present(&self.thumbnail_url)
    }

    pub fn optimized_thumbnail_url(&self) -> Option<&str> {
        present(&self.optimized_thumbnail_url)
    }

    pub fn original_url(&self) -> &str {
        self.video_url.trim()
    }
}

// ---------------------------------------------------------------------------
// FeedPage / FeedFilter
// ---------------------------------------------------------------------------

/// One fetched batch of records.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub records: Vec<VideoRecord>,
    /// Zero-based page number this batch answers.
    pub page: u32,
    /// No further pages exist.
    pub exhausted: bool,
}

impl FeedPage {
    /// Build a page, marking it exhausted when it came back short.
    pub fn from_records(records: Vec<VideoRecord>, page: u32, limit: usize) -> Self {
        let exhausted = records.len() < limit;
        Self {
            records,
            page,
            exhausted,
        }
    }
}

/// Search/category filter. An empty filter means the personalized feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedFilter {
    pub query: Option<String>,
    pub tags: Vec<String>,
}

impl FeedFilter {
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            query: Some(text.into()),
            tags: Vec::new(),
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            query: None,
            tags: vec![tag.into()],
        }
    }

    /// The trimmed query text, if any.
    pub fn query_text(&self) -> Option<&str> {
        present(&self.query)
    }

    pub fn is_empty(&self) -> bool {
        self.query_text().is_none() && self.tags.iter().all(|t| t.trim().is_empty())
    }
}
