use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tollgate_config::YoutubeConfig;
use tollgate_core::{Result, RetryPolicy, ServiceError, check_status, json_body, retry_with_backoff, send_error};
use url::Url;

use crate::{
    cache::ResponseCache,
    transcripts::TranscriptStore,
    types::{
        SearchRequest, SearchResponse, TranscriptRequest, TranscriptResponse, TranscriptSegment, VideoDetails,
        VideoRequest, VideoSummary, upstream,
    },
};

pub(crate) const SERVICE: &str = "youtube";

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

const DEFAULT_TRANSCRIPT_BASE_URL: &str = "https://www.youtube.com";

/// Client for the YouTube Data API v3 and caption tracks
///
/// Search and video lookups go through an in-memory TTL cache; fetched
/// transcripts are kept in a `SQLite` store.
pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: Url,
    transcript_base_url: Url,
    api_key: SecretString,
    timeout: Duration,
    retry: RetryPolicy,
    cache: ResponseCache,
    transcripts: TranscriptStore,
}

impl YoutubeClient {
    pub fn new(config: &YoutubeConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ServiceError::Config("API key required for YouTube".to_string()))?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| ServiceError::Config(e.to_string()))?,
        };

        let transcript_base_url = match &config.transcript_base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_TRANSCRIPT_BASE_URL).map_err(|e| ServiceError::Config(e.to_string()))?,
        };

        let transcripts = TranscriptStore::open(config.transcript_cache_path.as_deref())
            .map_err(|e| ServiceError::Config(format!("failed to open transcript cache: {e}")))?;

        Ok(Self {
            http: tollgate_core::http_client(),
            base_url,
            transcript_base_url,
            api_key,
            timeout: config.timeout(),
            retry: RetryPolicy::default(),
            cache: ResponseCache::new(config.cache_ttl(), config.cache_capacity),
            transcripts,
        })
    }

    /// Search videos, served from cache when possible
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        if let Some(cached) = self.cache.get_search(request) {
            tracing::debug!("youtube search cache hit");
            return Ok(cached);
        }

        let mut url = self.endpoint("search")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("q", request.query.trim())
            .append_pair("maxResults", &request.max_results.to_string())
            .append_pair("order", request.order.as_str());

        let list: upstream::List<upstream::SearchItem> = self.get_json(url).await?;

        let videos = list
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(VideoSummary {
                    video_id,
                    title: item.snippet.title,
                    channel_title: item.snippet.channel_title,
                    published_at: item.snippet.published_at,
                    description: item.snippet.description,
                    thumbnail: item.snippet.thumbnails.and_then(upstream::Thumbnails::best),
                })
            })
            .collect();

        let response = SearchResponse { videos };
        self.cache.put_search(request, response.clone());

        Ok(response)
    }

    /// Details and statistics of one video
    pub async fn video(&self, request: &VideoRequest) -> Result<VideoDetails> {
        if let Some(cached) = self.cache.get_video(&request.video_id) {
            tracing::debug!(video_id = %request.video_id, "youtube video cache hit");
            return Ok(cached);
        }

        let mut url = self.endpoint("videos")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet,contentDetails,statistics")
            .append_pair("id", &request.video_id);

        let list: upstream::List<upstream::Video> = self.get_json(url).await?;

        let video = list
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::api(Some(404), format!("video '{}' not found", request.video_id)))?;

        let (view_count, like_count, comment_count) = video.statistics.map_or((None, None, None), |s| {
            (parse_count(s.view_count), parse_count(s.like_count), parse_count(s.comment_count))
        });

        let details = VideoDetails {
            video_id: video.id,
            title: video.snippet.title,
            description: video.snippet.description,
            channel_title: video.snippet.channel_title,
            published_at: video.snippet.published_at,
            duration: video.content_details.map(|d| d.duration).unwrap_or_default(),
            view_count,
            like_count,
            comment_count,
            tags: video.snippet.tags,
        };

        self.cache.put_video(details.clone());

        Ok(details)
    }

    /// Caption track of a video, served from the transcript store when possible
    pub async fn transcript(&self, request: &TranscriptRequest) -> Result<TranscriptResponse> {
        match self.transcripts.get(&request.video_id, &request.language) {
            Ok(Some(cached)) => {
                tracing::debug!(video_id = %request.video_id, "youtube transcript cache hit");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "transcript cache read failed"),
        }

        let mut url = self.transcript_base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ServiceError::Config(format!("invalid transcript base URL '{}'", self.transcript_base_url)))?
            .pop_if_empty()
            .extend(["api", "timedtext"]);
        url.query_pairs_mut()
            .append_pair("v", &request.video_id)
            .append_pair("lang", &request.language)
            .append_pair("fmt", "json3");

        let not_found = || {
            ServiceError::api(
                Some(404),
                format!("no '{}' transcript for video '{}'", request.language, request.video_id),
            )
        };

        let body = self.get_text(&url).await?;
        if body.trim().is_empty() {
            return Err(not_found());
        }

        let track: upstream::TimedText = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "failed to decode caption track");
            ServiceError::api(Some(200), format!("unexpected response from {SERVICE}: {e}"))
        })?;

        let segments: Vec<TranscriptSegment> = track
            .events
            .into_iter()
            .filter_map(|event| {
                let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

                (!text.is_empty()).then_some(TranscriptSegment {
                    start_ms: event.t_start_ms,
                    duration_ms: event.d_duration_ms,
                    text,
                })
            })
            .collect();

        if segments.is_empty() {
            return Err(not_found());
        }

        let transcript = TranscriptResponse::new(&request.video_id, &request.language, segments);

        if let Err(e) = self.transcripts.put(&transcript) {
            tracing::warn!(error = %e, "transcript cache write failed");
        }

        Ok(transcript)
    }

    fn endpoint(&self, resource: &str) -> Result<Url> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|()| ServiceError::Config(format!("invalid youtube base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(["youtube", "v3", resource]);

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, mut url: Url) -> Result<T> {
        tracing::debug!(path = url.path(), query = url.query(), "calling youtube");

        url.query_pairs_mut().append_pair("key", self.api_key.expose_secret());
        let url = &url;

        retry_with_backoff(self.retry, move || async move {
            let response = self
                .http
                .get(url.clone())
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| send_error(SERVICE, &e.without_url()))?;

            json_body(SERVICE, response).await
        })
        .await
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        tracing::debug!(path = url.path(), query = url.query(), "calling youtube");

        retry_with_backoff(self.retry, move || async move {
            let response = self
                .http
                .get(url.clone())
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| send_error(SERVICE, &e.without_url()))?;

            check_status(SERVICE, response)
                .await?
                .text()
                .await
                .map_err(|e| ServiceError::Client(format!("failed to read {SERVICE} response body: {}", e.without_url())))
        })
        .await
    }
}

fn parse_count(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.parse().ok())
}
