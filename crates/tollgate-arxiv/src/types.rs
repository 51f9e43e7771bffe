use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tollgate_core::{Result, Validate, validate};

/// `2301.00001`, `2301.00001v2` or the older `hep-th/9901001`
static PAPER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}\.\d{4,5}|[a-z-]+(\.[A-Z]{2})?/\d{7})(v\d+)?$").expect("must be valid regex")
});

/// Search papers by query
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchRequest {
    /// Free text, or arXiv query syntax such as `ti:transformer AND au:vaswani`
    pub query: String,
    /// Number of papers (1-100)
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Validate for SearchRequest {
    fn validate(&self) -> Result<()> {
        validate::length("query", &self.query, 1, 300)?;
        validate::range("max_results", self.max_results, 1, 100)
    }
}

const fn default_max_results() -> u32 {
    10
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl SortBy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::LastUpdatedDate => "lastUpdatedDate",
            Self::SubmittedDate => "submittedDate",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total_results: u64,
    pub papers: Vec<ArxivSearchResult>,
}

/// One paper from the arXiv feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivSearchResult {
    /// Versioned arXiv id (`2301.00001v1`)
    pub id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    /// RFC 3339 timestamp of the first version
    pub published: String,
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

/// Fetch one paper by id
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PaperRequest {
    /// arXiv id, optionally versioned (`2301.00001`, `2301.00001v2`, `hep-th/9901001`)
    pub id: String,
}

impl Validate for PaperRequest {
    fn validate(&self) -> Result<()> {
        validate::pattern("id", &self.id, &PAPER_ID)
    }
}

/// arXiv Atom feed shapes
///
/// Element names are matched without their namespace prefix, so
/// `opensearch:totalResults` is `totalResults`.
pub(crate) mod upstream {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Feed {
        #[serde(rename = "totalResults", default)]
        pub total_results: Option<Text<u64>>,
        #[serde(rename = "entry", default)]
        pub entries: Vec<Entry>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Text<T> {
        #[serde(rename = "$text")]
        pub value: T,
    }

    #[derive(Debug, Deserialize)]
    pub struct Entry {
        pub id: String,
        #[serde(default)]
        pub title: String,
        #[serde(default)]
        pub summary: String,
        #[serde(default)]
        pub published: String,
        #[serde(default)]
        pub updated: String,
        #[serde(rename = "author", default)]
        pub authors: Vec<Author>,
        #[serde(rename = "link", default)]
        pub links: Vec<Link>,
        #[serde(default)]
        pub primary_category: Option<Category>,
        #[serde(rename = "category", default)]
        pub categories: Vec<Category>,
    }

    impl Entry {
        /// The API reports bad queries as a single entry under `/api/errors`
        pub fn is_error(&self) -> bool {
            self.id.contains("/api/errors")
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct Author {
        pub name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Link {
        #[serde(rename = "@href")]
        pub href: String,
        #[serde(rename = "@rel", default)]
        pub rel: Option<String>,
        #[serde(rename = "@title", default)]
        pub title: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Category {
        #[serde(rename = "@term")]
        pub term: String,
    }
}
