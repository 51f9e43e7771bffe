use std::time::Duration;

use mini_moka::sync::Cache;

use crate::types::{SearchRequest, SearchResponse, VideoDetails};

/// In-memory TTL cache for YouTube responses
///
/// Keys combine the operation with its normalized input, so requests that
/// differ only in case or spacing of the query share an entry.
#[derive(Clone)]
pub struct ResponseCache {
    searches: Cache<String, SearchResponse>,
    videos: Cache<String, VideoDetails>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            searches: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
            videos: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
        }
    }

    pub fn get_search(&self, request: &SearchRequest) -> Option<SearchResponse> {
        self.searches.get(&search_key(request))
    }

    pub fn put_search(&self, request: &SearchRequest, response: SearchResponse) {
        self.searches.insert(search_key(request), response);
    }

    /// Video ids are case-sensitive and used verbatim
    pub fn get_video(&self, video_id: &str) -> Option<VideoDetails> {
        self.videos.get(&format!("video:{video_id}"))
    }

    pub fn put_video(&self, details: VideoDetails) {
        self.videos.insert(format!("video:{}", details.video_id), details);
    }
}

fn search_key(request: &SearchRequest) -> String {
    let query = request
        .query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    format!("search:{query}:{}:{}", request.max_results, request.order.as_str())
}
