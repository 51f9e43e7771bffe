use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tollgate_core::{Result, Validate, validate};

/// Web search through Tavily
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchRequest {
    /// Search query (1-400 characters)
    pub query: String,
    #[serde(default)]
    pub search_depth: SearchDepth,
    #[serde(default)]
    pub topic: Topic,
    /// Number of results (1-20)
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Ask Tavily for a generated short answer
    #[serde(default)]
    pub include_answer: bool,
    /// Restrict results to these domains (at most 50)
    #[serde(default)]
    pub include_domains: Vec<String>,
    /// Drop results from these domains (at most 50)
    #[serde(default)]
    pub exclude_domains: Vec<String>,
}

impl Validate for SearchRequest {
    fn validate(&self) -> Result<()> {
        validate::length("query", &self.query, 1, 400)?;
        validate::range("max_results", self.max_results, 1, 20)?;
        validate::items("include_domains", self.include_domains.len(), 0, 50)?;
        validate::items("exclude_domains", self.exclude_domains.len(), 0, 50)?;

        for domain in self.include_domains.iter().chain(&self.exclude_domains) {
            validate::length("domains", domain, 1, 253)?;
        }

        Ok(())
    }
}

const fn default_max_results() -> u32 {
    5
}

/// Trade latency for relevance
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    #[default]
    General,
    News,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
    /// Seconds Tavily spent on the search
    #[serde(default)]
    pub response_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// Fetch and clean the main content of web pages
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtractRequest {
    /// Pages to extract (1-20 absolute http(s) URLs)
    pub urls: Vec<String>,
}

impl Validate for ExtractRequest {
    fn validate(&self) -> Result<()> {
        validate::items("urls", self.urls.len(), 1, 20)?;

        for url in &self.urls {
            validate::http_url("urls", url)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    #[serde(default)]
    pub results: Vec<ExtractResult>,
    #[serde(default)]
    pub failed_results: Vec<FailedResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResult {
    pub url: String,
    #[serde(default)]
    pub raw_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedResult {
    pub url: String,
    #[serde(default)]
    pub error: String,
}
