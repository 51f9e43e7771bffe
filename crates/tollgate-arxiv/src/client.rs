use std::time::Duration;

use tollgate_config::ArxivConfig;
use tollgate_core::{Result, RetryPolicy, ServiceError, retry_with_backoff, send_error};
use url::Url;

use crate::types::{ArxivSearchResult, PaperRequest, SearchRequest, SearchResponse, upstream};

pub(crate) const SERVICE: &str = "arxiv";

const DEFAULT_BASE_URL: &str = "https://export.arxiv.org";

/// Client for the arXiv Atom query API
pub struct ArxivClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ArxivClient {
    pub fn new(config: &ArxivConfig) -> Result<Self> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| ServiceError::Config(e.to_string()))?,
        };

        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Config(format!("invalid arxiv base URL '{base_url}'")));
        }

        Ok(Self {
            http: tollgate_core::http_client(),
            base_url,
            timeout: config.timeout(),
            retry: RetryPolicy::default(),
        })
    }

    /// Search papers, newest or most relevant first
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let mut url = self.endpoint()?;
        url.query_pairs_mut()
            .append_pair("search_query", &search_query(&request.query))
            .append_pair("start", "0")
            .append_pair("max_results", &request.max_results.to_string())
            .append_pair("sortBy", request.sort_by.as_str())
            .append_pair("sortOrder", request.sort_order.as_str());

        let feed = self.get_feed(&url).await?;

        let papers: Vec<ArxivSearchResult> = feed.entries.into_iter().map(paper_from_entry).collect();
        let total_results = feed.total_results.map_or(papers.len() as u64, |total| total.value);

        Ok(SearchResponse { total_results, papers })
    }

    /// One paper by id
    pub async fn paper(&self, request: &PaperRequest) -> Result<ArxivSearchResult> {
        let mut url = self.endpoint()?;
        url.query_pairs_mut()
            .append_pair("id_list", &request.id)
            .append_pair("max_results", "1");

        self.get_feed(&url)
            .await?
            .entries
            .into_iter()
            .find(|entry| !entry.title.trim().is_empty())
            .map(paper_from_entry)
            .ok_or_else(|| ServiceError::api(Some(404), format!("paper '{}' not found", request.id)))
    }

    fn endpoint(&self) -> Result<Url> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|()| ServiceError::Config(format!("invalid arxiv base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "query"]);

        Ok(url)
    }

    async fn get_feed(&self, url: &Url) -> Result<upstream::Feed> {
        retry_with_backoff(self.retry, move || async move {
            tracing::debug!(query = url.query(), "calling arxiv");

            let response = self
                .http
                .get(url.clone())
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| send_error(SERVICE, &e))?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                ServiceError::Client(format!("failed to read {SERVICE} response body: {}", e.without_url()))
            })?;

            parse_feed(status, &body)
        })
        .await
    }
}

/// Decode an Atom feed, surfacing the API's in-feed error entries
fn parse_feed(status: u16, body: &str) -> Result<upstream::Feed> {
    let feed = quick_xml::de::from_str::<upstream::Feed>(body);

    if let Ok(feed) = &feed
        && let Some(error) = feed.entries.iter().find(|entry| entry.is_error())
    {
        let status = if (200..300).contains(&status) { 400 } else { status };
        tracing::error!(status, "arxiv rejected the query");
        return Err(ServiceError::api(Some(status), collapse_whitespace(&error.summary)));
    }

    if !(200..300).contains(&status) {
        tracing::error!(status, "upstream API error");
        return Err(ServiceError::from_upstream(status, body));
    }

    feed.map_err(|e| {
        tracing::error!(error = %e, "failed to decode arxiv feed");
        ServiceError::api(Some(status), format!("unexpected response from {SERVICE}: {e}"))
    })
}

/// Plain text searches every field; anything with a field prefix passes through
fn search_query(query: &str) -> String {
    let query = query.trim();

    if query.contains(':') {
        query.to_string()
    } else {
        format!("all:{query}")
    }
}

fn paper_from_entry(entry: upstream::Entry) -> ArxivSearchResult {
    let id = entry
        .id
        .rsplit_once("/abs/")
        .map_or_else(|| entry.id.clone(), |(_, id)| id.to_string());

    let abstract_url = entry
        .links
        .iter()
        .find(|link| link.rel.as_deref() == Some("alternate"))
        .map(|link| link.href.clone());
    let pdf_url = entry
        .links
        .iter()
        .find(|link| link.title.as_deref() == Some("pdf"))
        .map(|link| link.href.clone());

    ArxivSearchResult {
        id,
        title: collapse_whitespace(&entry.title),
        summary: collapse_whitespace(&entry.summary),
        authors: entry.authors.into_iter().map(|author| author.name.trim().to_string()).collect(),
        published: entry.published,
        updated: entry.updated,
        primary_category: entry.primary_category.map(|category| category.term),
        categories: entry.categories.into_iter().map(|category| category.term).collect(),
        abstract_url,
        pdf_url,
    }
}

/// Titles and abstracts arrive hard-wrapped
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;
    use crate::types::{SortBy, SortOrder};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query?search_query%3Dall%3Arust" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=all:rust</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <updated>2024-01-02T00:00:00-05:00</updated>
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">2741</opensearch:totalResults>
  <opensearch:startIndex xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">0</opensearch:startIndex>
  <opensearch:itemsPerPage xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">1</opensearch:itemsPerPage>
  <entry>
    <id>http://arxiv.org/abs/2301.00001v2</id>
    <updated>2023-02-01T12:00:00Z</updated>
    <published>2023-01-01T12:00:00Z</published>
    <title>Ownership Types
      for Safe Systems Programming</title>
    <summary>  We study the borrow checker.
      It is sound.
    </summary>
    <author>
      <name>Ada Lovelace</name>
    </author>
    <author>
      <name>Alan Turing</name>
    </author>
    <arxiv:doi xmlns:arxiv="http://arxiv.org/schemas/atom">10.1000/182</arxiv:doi>
    <link title="doi" href="http://dx.doi.org/10.1000/182" rel="related"/>
    <arxiv:comment xmlns:arxiv="http://arxiv.org/schemas/atom">12 pages</arxiv:comment>
    <link href="http://arxiv.org/abs/2301.00001v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2301.00001v2" rel="related" type="application/pdf"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.PL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.PL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LO" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    const ERROR_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">1</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
    <title>Error</title>
    <summary>incorrect id format for 1234</summary>
    <updated>2024-01-02T00:00:00-05:00</updated>
    <link href="http://arxiv.org/api/errors#incorrect_id_format_for_1234" rel="alternate" type="text/html"/>
    <author>
      <name>arXiv api core</name>
    </author>
  </entry>
</feed>"#;

    const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">0</opensearch:totalResults>
</feed>"#;

    fn client(server: &MockServer) -> ArxivClient {
        let config: ArxivConfig = toml::from_str(&format!("base_url = \"{}\"", server.uri())).unwrap();
        ArxivClient::new(&config).unwrap()
    }

    fn atom(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/atom+xml")
    }

    #[test]
    fn plain_queries_search_all_fields() {
        assert_eq!(search_query(" graph neural networks "), "all:graph neural networks");
        assert_eq!(search_query("ti:transformer AND au:vaswani"), "ti:transformer AND au:vaswani");
    }

    #[test]
    fn feed_entries_map_to_papers() {
        let feed = parse_feed(200, FEED).unwrap();
        assert_eq!(feed.total_results.map(|t| t.value), Some(2741));

        let paper = paper_from_entry(feed.entries.into_iter().next().unwrap());
        assert_eq!(paper.id, "2301.00001v2");
        assert_eq!(paper.title, "Ownership Types for Safe Systems Programming");
        assert_eq!(paper.summary, "We study the borrow checker. It is sound.");
        assert_eq!(paper.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(paper.primary_category.as_deref(), Some("cs.PL"));
        assert_eq!(paper.categories, vec!["cs.PL", "cs.LO"]);
        assert_eq!(paper.abstract_url.as_deref(), Some("http://arxiv.org/abs/2301.00001v2"));
        assert_eq!(paper.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2301.00001v2"));
    }

    #[test]
    fn error_entry_is_an_api_error() {
        let err = parse_feed(400, ERROR_FEED).unwrap_err();
        assert!(
            matches!(err, ServiceError::Api { status: Some(400), ref message, .. } if message == "incorrect id format for 1234")
        );
    }

    #[tokio::test]
    async fn search_sends_query_and_sorting() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("search_query", "all:borrow checker"))
            .and(query_param("max_results", "5"))
            .and(query_param("sortBy", "submittedDate"))
            .and(query_param("sortOrder", "ascending"))
            .respond_with(atom(FEED))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .search(&SearchRequest {
                query: "borrow checker".into(),
                max_results: 5,
                sort_by: SortBy::SubmittedDate,
                sort_order: SortOrder::Ascending,
            })
            .await
            .unwrap();

        assert_eq!(response.total_results, 2741);
        assert_eq!(response.papers.len(), 1);
    }

    #[tokio::test]
    async fn paper_uses_id_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("id_list", "2301.00001v2"))
            .respond_with(atom(FEED))
            .mount(&server)
            .await;

        let paper = client(&server)
            .paper(&PaperRequest {
                id: "2301.00001v2".into(),
            })
            .await
            .unwrap();

        assert_eq!(paper.authors.len(), 2);
    }

    #[tokio::test]
    async fn unknown_paper_is_api_404() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(atom(EMPTY_FEED))
            .mount(&server)
            .await;

        let err = client(&server)
            .paper(&PaperRequest {
                id: "2301.99999".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Api { status: Some(404), .. }));
    }

    #[tokio::test]
    async fn html_body_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>maintenance</body></html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .paper(&PaperRequest {
                id: "2301.00001".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Api { .. }));
    }
}
