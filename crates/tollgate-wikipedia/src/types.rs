use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tollgate_core::{Result, Validate, validate};

/// Full-text search over article titles and bodies
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchRequest {
    /// Search terms (1-300 characters)
    pub query: String,
    /// Maximum number of results (1-50)
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

impl Validate for SearchRequest {
    fn validate(&self) -> Result<()> {
        validate::length("query", &self.query, 1, 300)?;
        validate::range("limit", self.limit, 1, 50)
    }
}

const fn default_search_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_hits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub page_id: u64,
    /// Matching excerpt with markup removed
    pub snippet: String,
    pub word_count: u64,
}

/// Lead section summary of one article
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SummaryRequest {
    /// Exact article title (1-256 characters)
    pub title: String,
}

impl Validate for SummaryRequest {
    fn validate(&self) -> Result<()> {
        validate::length("title", &self.title, 1, 256)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub extract: String,
    pub url: Option<String>,
}

/// Plain-text body of one article
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ArticleRequest {
    /// Exact article title (1-256 characters)
    pub title: String,
    /// Truncate the content after this many characters (100-100000)
    #[serde(default = "default_max_chars")]
    pub max_chars: u32,
}

impl Validate for ArticleRequest {
    fn validate(&self) -> Result<()> {
        validate::length("title", &self.title, 1, 256)?;
        validate::range("max_chars", self.max_chars, 100, 100_000)
    }
}

const fn default_max_chars() -> u32 {
    20_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub title: String,
    pub page_id: u64,
    pub content: String,
    /// Whether `content` was cut at `max_chars`
    pub truncated: bool,
}

/// Upstream response shapes
pub(crate) mod upstream {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct SearchEnvelope {
        pub query: SearchQuery,
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchQuery {
        #[serde(default)]
        pub searchinfo: Option<SearchInfo>,
        #[serde(default)]
        pub search: Vec<SearchHit>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchInfo {
        #[serde(default)]
        pub totalhits: u64,
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchHit {
        pub title: String,
        pub pageid: u64,
        #[serde(default)]
        pub snippet: String,
        #[serde(default)]
        pub wordcount: u64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Summary {
        pub title: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub extract: String,
        #[serde(default)]
        pub content_urls: Option<ContentUrls>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ContentUrls {
        pub desktop: Option<PageUrl>,
    }

    #[derive(Debug, Deserialize)]
    pub struct PageUrl {
        pub page: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ExtractEnvelope {
        pub query: ExtractQuery,
    }

    #[derive(Debug, Deserialize)]
    pub struct ExtractQuery {
        #[serde(default)]
        pub pages: Vec<ExtractPage>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ExtractPage {
        pub title: String,
        #[serde(default)]
        pub pageid: Option<u64>,
        #[serde(default)]
        pub missing: bool,
        #[serde(default)]
        pub invalid: bool,
        #[serde(default)]
        pub extract: Option<String>,
    }
}
