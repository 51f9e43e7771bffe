use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tollgate_config::QdrantConfig;
use tollgate_core::{Result, RetryPolicy, ServiceError, json_body, retry_with_backoff, send_error};
use url::Url;

use crate::types::{
    CollectionInfo, CollectionInfoRequest, CollectionsResponse, Point, ScoredPoint, SearchRequest, SearchResponse,
    UpsertRequest, UpsertResponse, upstream,
};

pub(crate) const SERVICE: &str = "qdrant";

/// Client for the Qdrant REST API
pub struct QdrantClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    vector: &'a [f32],
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    score_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Value>,
    with_payload: bool,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    points: &'a [Point],
}

impl QdrantClient {
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        if config.url.cannot_be_a_base() {
            return Err(ServiceError::Config(format!("invalid qdrant URL '{}'", config.url)));
        }

        Ok(Self {
            http: tollgate_core::http_client(),
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
            retry: RetryPolicy::default(),
        })
    }

    /// Names of every collection
    pub async fn collections(&self) -> Result<CollectionsResponse> {
        let url = self.endpoint(&["collections"])?;
        let list: upstream::CollectionList = self.read(Method::GET, &url, None::<&()>).await?;

        Ok(CollectionsResponse {
            collections: list.collections.into_iter().map(|c| c.name).collect(),
        })
    }

    pub async fn collection_info(&self, request: &CollectionInfoRequest) -> Result<CollectionInfo> {
        let url = self.endpoint(&["collections", &request.collection])?;
        let info: upstream::CollectionInfo = self.read(Method::GET, &url, None::<&()>).await?;

        Ok(CollectionInfo {
            name: request.collection.clone(),
            status: info.status,
            points_count: info.points_count.unwrap_or_default(),
            vectors_count: info.vectors_count,
        })
    }

    /// Nearest points to a query vector, payloads included
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = self.endpoint(&["collections", &request.collection, "points", "search"])?;
        let body = SearchBody {
            vector: &request.vector,
            limit: request.limit,
            score_threshold: request.score_threshold,
            filter: request.filter.as_ref(),
            with_payload: true,
        };

        let points: Vec<ScoredPoint> = self.read(Method::POST, &url, Some(&body)).await?;

        Ok(SearchResponse { points })
    }

    /// Write points and wait until they are applied. Not retried.
    pub async fn upsert(&self, request: &UpsertRequest) -> Result<UpsertResponse> {
        let mut url = self.endpoint(&["collections", &request.collection, "points"])?;
        url.query_pairs_mut().append_pair("wait", "true");

        tracing::debug!(collection = %request.collection, points = request.points.len(), "qdrant upsert");

        let response = self
            .request(Method::PUT, &url)
            .json(&UpsertBody {
                points: &request.points,
            })
            .send()
            .await
            .map_err(|e| send_error(SERVICE, &e))?;

        let envelope: upstream::Envelope<UpsertResponse> = json_body(SERVICE, response).await?;
        Ok(envelope.result)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|()| ServiceError::Config(format!("invalid qdrant URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        let builder = self.http.request(method, url.clone()).timeout(self.timeout);

        match &self.api_key {
            Some(key) => builder.header("api-key", key.expose_secret()),
            None => builder,
        }
    }

    /// Idempotent call returning the unwrapped `result`
    async fn read<B, T>(&self, method: Method, url: &Url, body: Option<&B>) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let method = &method;

        retry_with_backoff(self.retry, move || async move {
            tracing::debug!(method = %method, url = %url, "calling qdrant");

            let mut builder = self.request(method.clone(), url);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| send_error(SERVICE, &e))?;
            let envelope: upstream::Envelope<T> = json_body(SERVICE, response).await?;

            Ok(envelope.result)
        })
        .await
    }
}
