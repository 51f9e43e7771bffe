use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tollgate_core::{Result, ServiceError, Validate, validate};

static COLLECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,255}$").expect("must be valid regex"));

static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("must be valid regex")
});

const MAX_DIMENSIONS: usize = 4096;

/// List every collection
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CollectionsRequest {}

impl Validate for CollectionsRequest {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsResponse {
    pub collections: Vec<String>,
}

/// Status and size of one collection
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CollectionInfoRequest {
    /// Collection name (letters, digits, `_` and `-`)
    pub collection: String,
}

impl Validate for CollectionInfoRequest {
    fn validate(&self) -> Result<()> {
        validate::pattern("collection", &self.collection, &COLLECTION)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    /// `green`, `yellow`, `grey` or `red`
    pub status: String,
    pub points_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectors_count: Option<u64>,
}

/// Nearest-neighbour search
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchRequest {
    pub collection: String,
    /// Query vector (1-4096 finite values)
    pub vector: Vec<f32>,
    /// Number of points to return (1-100)
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Drop points scoring below this value
    #[serde(default)]
    pub score_threshold: Option<f32>,
    /// Qdrant filter object (`must`, `should`, `must_not`)
    #[serde(default)]
    pub filter: Option<Value>,
}

impl Validate for SearchRequest {
    fn validate(&self) -> Result<()> {
        validate::pattern("collection", &self.collection, &COLLECTION)?;
        vector("vector", &self.vector)?;
        validate::range("limit", self.limit, 1, 100)?;

        if let Some(threshold) = self.score_threshold
            && !threshold.is_finite()
        {
            return Err(ServiceError::validation("score_threshold", "must be a finite number"));
        }

        if let Some(filter) = &self.filter
            && !filter.is_object()
        {
            return Err(ServiceError::validation("filter", "must be an object"));
        }

        Ok(())
    }
}

const fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub points: Vec<ScoredPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    #[serde(default)]
    pub payload: Value,
}

/// Insert or replace points
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpsertRequest {
    pub collection: String,
    /// Points to write (1-1000)
    pub points: Vec<Point>,
}

impl Validate for UpsertRequest {
    fn validate(&self) -> Result<()> {
        validate::pattern("collection", &self.collection, &COLLECTION)?;
        validate::items("points", self.points.len(), 1, 1000)?;

        for point in &self.points {
            if let PointId::Uuid(id) = &point.id {
                validate::pattern("points.id", id, &UUID)?;
            }

            vector("points.vector", &point.vector)?;

            if let Some(payload) = &point.payload
                && !payload.is_object()
            {
                return Err(ServiceError::validation("points.payload", "must be an object"));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Point {
    pub id: PointId,
    pub vector: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Unsigned integer or UUID point identifier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<u64>,
    /// `acknowledged` or `completed`
    pub status: String,
}

fn vector(field: &str, values: &[f32]) -> Result<()> {
    validate::items(field, values.len(), 1, MAX_DIMENSIONS)?;

    if values.iter().any(|v| !v.is_finite()) {
        return Err(ServiceError::validation(field, "must contain only finite numbers"));
    }

    Ok(())
}

/// Qdrant REST response shapes
pub(crate) mod upstream {
    use serde::Deserialize;

    /// Every Qdrant response wraps its payload in `result`
    #[derive(Debug, Deserialize)]
    pub struct Envelope<T> {
        pub result: T,
    }

    #[derive(Debug, Deserialize)]
    pub struct CollectionList {
        #[serde(default)]
        pub collections: Vec<CollectionName>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CollectionName {
        pub name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct CollectionInfo {
        pub status: String,
        #[serde(default)]
        pub points_count: Option<u64>,
        #[serde(default)]
        pub vectors_count: Option<u64>,
    }
}
