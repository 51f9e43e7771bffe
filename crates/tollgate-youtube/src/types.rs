use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tollgate_core::{Result, Validate, validate};

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("must be valid regex"));

static LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,3}(-[A-Za-z]{2,4})?$").expect("must be valid regex"));

/// Search public videos
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchRequest {
    /// Search terms (1-200 characters)
    pub query: String,
    /// Number of videos (1-50)
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub order: SearchOrder,
}

impl Validate for SearchRequest {
    fn validate(&self) -> Result<()> {
        validate::length("query", &self.query, 1, 200)?;
        validate::range("max_results", self.max_results, 1, 50)
    }
}

const fn default_max_results() -> u32 {
    10
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SearchOrder {
    #[default]
    Relevance,
    Date,
    ViewCount,
    Rating,
}

impl SearchOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Date => "date",
            Self::ViewCount => "viewCount",
            Self::Rating => "rating",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub videos: Vec<VideoSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    /// RFC 3339 timestamp
    pub published_at: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Details and statistics of one video
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VideoRequest {
    /// 11-character video id (`dQw4w9WgXcQ`)
    pub video_id: String,
}

impl Validate for VideoRequest {
    fn validate(&self) -> Result<()> {
        validate::pattern("video_id", &self.video_id, &VIDEO_ID)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub published_at: String,
    /// ISO 8601 duration (`PT4M13S`)
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
    pub tags: Vec<String>,
}

/// Caption track of one video
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TranscriptRequest {
    /// 11-character video id (`dQw4w9WgXcQ`)
    pub video_id: String,
    /// Caption language code (`en`, `pt-BR`)
    #[serde(default = "default_language")]
    pub language: String,
}

impl Validate for TranscriptRequest {
    fn validate(&self) -> Result<()> {
        validate::pattern("video_id", &self.video_id, &VIDEO_ID)?;
        validate::pattern("language", &self.language, &LANGUAGE)
    }
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub video_id: String,
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
    /// Segment texts joined with spaces
    pub text: String,
}

impl TranscriptResponse {
    pub fn new(video_id: &str, language: &str, segments: Vec<TranscriptSegment>) -> Self {
        let text = segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            video_id: video_id.to_string(),
            language: language.to_string(),
            segments,
            text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_ms: u64,
    pub duration_ms: u64,
    pub text: String,
}

/// YouTube Data API v3 response shapes
pub(crate) mod upstream {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct List<T> {
        #[serde(default = "Vec::new")]
        pub items: Vec<T>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchItem {
        pub id: SearchId,
        pub snippet: Snippet,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchId {
        #[serde(default)]
        pub video_id: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Snippet {
        pub title: String,
        #[serde(default)]
        pub description: String,
        #[serde(default)]
        pub channel_title: String,
        #[serde(default)]
        pub published_at: String,
        #[serde(default)]
        pub thumbnails: Option<Thumbnails>,
        #[serde(default)]
        pub tags: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Thumbnails {
        pub high: Option<Thumbnail>,
        pub medium: Option<Thumbnail>,
        pub default: Option<Thumbnail>,
    }

    impl Thumbnails {
        /// Largest available thumbnail
        pub fn best(self) -> Option<String> {
            self.high.or(self.medium).or(self.default).map(|t| t.url)
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct Thumbnail {
        pub url: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Video {
        pub id: String,
        pub snippet: Snippet,
        #[serde(default)]
        pub content_details: Option<ContentDetails>,
        #[serde(default)]
        pub statistics: Option<Statistics>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ContentDetails {
        #[serde(default)]
        pub duration: String,
    }

    /// Counts are reported as decimal strings
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Statistics {
        pub view_count: Option<String>,
        pub like_count: Option<String>,
        pub comment_count: Option<String>,
    }

    /// `timedtext` caption track in `json3` format
    #[derive(Debug, Deserialize)]
    pub struct TimedText {
        #[serde(default)]
        pub events: Vec<CaptionEvent>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CaptionEvent {
        #[serde(default)]
        pub t_start_ms: u64,
        #[serde(default)]
        pub d_duration_ms: u64,
        #[serde(default)]
        pub segs: Vec<CaptionSegment>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CaptionSegment {
        #[serde(default)]
        pub utf8: String,
    }
}
