use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use serde::de::DeserializeOwned;
use tollgate_config::WikipediaConfig;
use tollgate_core::{Result, RetryPolicy, ServiceError, json_body, retry_with_backoff, send_error};
use url::Url;

use crate::types::{
    ArticleRequest, ArticleResponse, SearchRequest, SearchResponse, SearchResult, SummaryRequest, SummaryResponse,
    upstream,
};

pub(crate) const SERVICE: &str = "wikipedia";

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("must be valid regex"));

/// Client for the MediaWiki action API and the Wikipedia REST API
pub struct WikipediaClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    retry: RetryPolicy,
}

impl WikipediaClient {
    pub fn new(config: &WikipediaConfig) -> Result<Self> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(&format!("https://{}.wikipedia.org", config.language))
                .map_err(|e| ServiceError::Config(format!("invalid wikipedia language '{}': {e}", config.language)))?,
        };

        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Config(format!("invalid wikipedia base URL '{base_url}'")));
        }

        Ok(Self {
            http: tollgate_core::http_client(),
            base_url,
            timeout: config.timeout(),
            retry: RetryPolicy::default(),
        })
    }

    /// Search articles by text
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let mut url = self.endpoint(&["w", "api.php"])?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("list", "search")
            .append_pair("srsearch", &request.query)
            .append_pair("srlimit", &request.limit.to_string())
            .append_pair("srprop", "snippet|wordcount")
            .append_pair("format", "json")
            .append_pair("utf8", "1");

        let envelope: upstream::SearchEnvelope = self.get_json(&url).await?;

        let results = envelope
            .query
            .search
            .into_iter()
            .map(|hit| SearchResult {
                title: hit.title,
                page_id: hit.pageid,
                snippet: strip_markup(&hit.snippet),
                word_count: hit.wordcount,
            })
            .collect::<Vec<_>>();

        let total_hits = envelope
            .query
            .searchinfo
            .map_or(results.len() as u64, |info| info.totalhits);

        Ok(SearchResponse { results, total_hits })
    }

    /// Lead section summary of an article
    pub async fn summary(&self, request: &SummaryRequest) -> Result<SummaryResponse> {
        let title = request.title.trim().replace(' ', "_");
        let url = self.endpoint(&["api", "rest_v1", "page", "summary", &title])?;

        let summary: upstream::Summary = self.get_json(&url).await?;

        Ok(SummaryResponse {
            title: summary.title,
            description: summary.description,
            extract: summary.extract,
            url: summary.content_urls.and_then(|urls| urls.desktop).map(|desktop| desktop.page),
        })
    }

    /// Plain-text article content, truncated to `max_chars`
    pub async fn article(&self, request: &ArticleRequest) -> Result<ArticleResponse> {
        let mut url = self.endpoint(&["w", "api.php"])?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("prop", "extracts")
            .append_pair("explaintext", "1")
            .append_pair("redirects", "1")
            .append_pair("titles", request.title.trim())
            .append_pair("format", "json")
            .append_pair("formatversion", "2");

        let envelope: upstream::ExtractEnvelope = self.get_json(&url).await?;

        let page = envelope
            .query
            .pages
            .into_iter()
            .next()
            .filter(|page| !page.missing && !page.invalid)
            .ok_or_else(|| ServiceError::api(Some(404), format!("article '{}' not found", request.title)))?;

        let content = page.extract.unwrap_or_default();
        let (content, truncated) = truncate_chars(content, request.max_chars as usize);

        Ok(ArticleResponse {
            title: page.title,
            page_id: page.pageid.unwrap_or_default(),
            content,
            truncated,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|()| ServiceError::Config(format!("invalid wikipedia base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        retry_with_backoff(self.retry, move || async move {
            tracing::debug!(url = %url, "calling wikipedia");

            let response = self
                .http
                .get(url.clone())
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| send_error(SERVICE, &e))?;

            json_body(SERVICE, response).await
        })
        .await
    }
}

/// Remove HTML tags and decode the entities MediaWiki emits in snippets
fn strip_markup(html: &str) -> String {
    TAGS.replace_all(html, "")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn truncate_chars(content: String, max_chars: usize) -> (String, bool) {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (content[..byte_index].to_string(), true),
        None => (content, false),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;

    async fn client(server: &MockServer) -> WikipediaClient {
        let config: WikipediaConfig = toml::from_str(&format!("base_url = \"{}\"", server.uri())).unwrap();
        WikipediaClient::new(&config).unwrap()
    }

    #[test]
    fn markup_is_stripped_from_snippets() {
        let snippet = r#"The <span class="searchmatch">Rust</span> language &amp; &quot;cargo&quot;"#;
        assert_eq!(strip_markup(snippet), "The Rust language & \"cargo\"");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo".to_string(), 2), ("hé".to_string(), true));
        assert_eq!(truncate_chars("hi".to_string(), 2), ("hi".to_string(), false));
    }

    #[test]
    fn default_base_url_uses_language() {
        let config: WikipediaConfig = toml::from_str("language = \"de\"").unwrap();
        let client = WikipediaClient::new(&config).unwrap();
        assert_eq!(client.base_url.as_str(), "https://de.wikipedia.org/");
    }

    #[tokio::test]
    async fn search_maps_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("list", "search"))
            .and(query_param("srsearch", "rust language"))
            .and(query_param("srlimit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {
                    "searchinfo": {"totalhits": 1234},
                    "search": [
                        {"title": "Rust (programming language)", "pageid": 29414838,
                         "snippet": "<span class=\"searchmatch\">Rust</span> is fast", "wordcount": 9000}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let response = client(&server)
            .await
            .search(&SearchRequest {
                query: "rust language".into(),
                limit: 2,
            })
            .await
            .unwrap();

        assert_eq!(response.total_hits, 1234);
        assert_eq!(response.results[0].page_id, 29_414_838);
        assert_eq!(response.results[0].snippet, "Rust is fast");
    }

    #[tokio::test]
    async fn summary_encodes_title() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Alan_Turing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Alan Turing",
                "description": "English mathematician",
                "extract": "Alan Mathison Turing was...",
                "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Alan_Turing"}}
            })))
            .mount(&server)
            .await;

        let summary = client(&server)
            .await
            .summary(&SummaryRequest {
                title: "Alan Turing".into(),
            })
            .await
            .unwrap();

        assert_eq!(summary.description.as_deref(), Some("English mathematician"));
        assert_eq!(summary.url.as_deref(), Some("https://en.wikipedia.org/wiki/Alan_Turing"));
    }

    #[tokio::test]
    async fn missing_summary_is_api_404() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "type": "https://mediawiki.org/wiki/HyperSwitch/errors/not_found",
                "title": "Not found.",
                "detail": "Page or revision not found."
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .summary(&SummaryRequest { title: "Nope".into() })
            .await
            .unwrap_err();

        assert!(
            matches!(err, ServiceError::Api { status: Some(404), ref message, .. } if message == "Page or revision not found.")
        );
    }

    #[tokio::test]
    async fn article_is_truncated() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "extracts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"pages": [{"pageid": 7, "title": "Long", "extract": "a".repeat(150)}]}
            })))
            .mount(&server)
            .await;

        let article = client(&server)
            .await
            .article(&ArticleRequest {
                title: "Long".into(),
                max_chars: 100,
            })
            .await
            .unwrap();

        assert_eq!(article.content.len(), 100);
        assert!(article.truncated);
        assert_eq!(article.page_id, 7);
    }

    #[tokio::test]
    async fn missing_article_is_api_404() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"pages": [{"title": "Nope", "missing": true}]}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .article(&ArticleRequest {
                title: "Nope".into(),
                max_chars: 1000,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Api { status: Some(404), .. }));
    }

    #[tokio::test]
    async fn unexpected_body_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .search(&SearchRequest {
                query: "x".into(),
                limit: 1,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Api { status: Some(200), .. }));
    }
}
