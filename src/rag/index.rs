//! Vector index backends
//!
//! `PineconeIndex` talks to the hosted data plane over REST.
//! `MemoryIndex` keeps vectors in process and ranks by cosine similarity.

use crate::config::{api_key, Config};
use crate::error::{ApiError, Error, Result};
use crate::http::{self, RetryPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::RwLock;
use tracing::{debug, info};

const SERVICE: &str = "pinecone";
const CONTROL_PLANE: &str = "https://api.pinecone.io";

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredVector {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace vectors by id, returning how many were written
    async fn upsert(&self, vectors: Vec<Vector>) -> Result<usize>;

    /// Best `top_k` matches, highest score first
    async fn query(&self, vector: &[f32], top_k: usize, filter: &Metadata) -> Result<Vec<ScoredVector>>;

    fn name(&self) -> &str;
}

pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: String,
    index: String,
    host: String,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [Vector],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    #[serde(skip_serializing_if = "is_empty_filter")]
    filter: &'a Metadata,
    include_metadata: bool,
}

fn is_empty_filter(filter: &&Metadata) -> bool {
    filter.is_empty()
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub matches: Vec<ScoredVector>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

impl PineconeIndex {
    /// Connect using `PINECONE_API_KEY`; the host is looked up when not configured
    pub async fn connect(config: &Config) -> Result<Self> {
        let key = api_key("PINECONE_API_KEY").ok_or_else(|| {
            Error::Api(ApiError::MissingCredential {
                service: SERVICE.to_string(),
                hint: "Missing PINECONE_API_KEY".to_string(),
            })
        })?;
        let client = http::client(&config.http)?;
        let retry = RetryPolicy::from(&config.http);

        let host = match &config.rag.host {
            Some(host) => host.clone(),
            None => describe_host(&client, &key, &config.rag.index, &retry).await?,
        };

        info!("Connected to index {} at {}", config.rag.index, host);
        Ok(Self {
            client,
            api_key: key,
            index: config.rag.index.clone(),
            host: base_url(&host),
            retry,
        })
    }

    async fn upsert_once(&self, vectors: &[Vector]) -> Result<usize> {
        let response = self
            .client
            .post(format!("{}/vectors/upsert", self.host))
            .header("Api-Key", &self.api_key)
            .json(&UpsertRequest { vectors })
            .send()
            .await
            .map_err(|e| http::transport_error(SERVICE, e))?;
        let body: UpsertResponse = http::json_body(SERVICE, response).await?;
        Ok(body.upserted_count)
    }

    async fn query_once(&self, request: &QueryRequest<'_>) -> Result<Vec<ScoredVector>> {
        let response = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| http::transport_error(SERVICE, e))?;
        let body: QueryResponse = http::json_body(SERVICE, response).await?;
        Ok(body.matches)
    }
}

async fn describe_host(
    client: &reqwest::Client,
    key: &str,
    index: &str,
    retry: &RetryPolicy,
) -> Result<String> {
    debug!("Resolving host for index {}", index);
    let body: DescribeIndexResponse = http::with_retry(SERVICE, retry, move || async move {
        let response = client
            .get(format!("{}/indexes/{}", CONTROL_PLANE, index))
            .header("Api-Key", key)
            .send()
            .await
            .map_err(|e| http::transport_error(SERVICE, e))?;
        http::json_body(SERVICE, response).await
    })
    .await?;
    Ok(body.host)
}

/// Index hosts come back bare (`idx-abc.svc.pinecone.io`)
fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait::async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, vectors: Vec<Vector>) -> Result<usize> {
        let batch = &vectors;
        let count = http::with_retry(SERVICE, &self.retry, move || self.upsert_once(batch)).await?;
        info!("Upserted {} vectors into {}", count, self.index);
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize, filter: &Metadata) -> Result<Vec<ScoredVector>> {
        let request = QueryRequest {
            vector,
            top_k,
            filter,
            include_metadata: true,
        };
        let request = &request;
        http::with_retry(SERVICE, &self.retry, move || self.query_once(request)).await
    }

    fn name(&self) -> &str {
        &self.index
    }
}

/// In-process index, exact cosine similarity over all stored vectors
#[derive(Debug, Default)]
pub struct MemoryIndex {
    vectors: RwLock<Vec<Vector>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vectors.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn matches_filter(metadata: &Metadata, filter: &Metadata) -> bool {
    filter.iter().all(|(key, value)| metadata.get(key) == Some(value))
}

fn poisoned() -> Error {
    Error::Api(ApiError::RequestFailed {
        service: "memory-index".to_string(),
        source: "index lock poisoned".to_string(),
    })
}

#[async_trait::async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, vectors: Vec<Vector>) -> Result<usize> {
        let mut stored = self.vectors.write().map_err(|_| poisoned())?;
        let count = vectors.len();
        for vector in vectors {
            match stored.iter_mut().find(|v| v.id == vector.id) {
                Some(existing) => *existing = vector,
                None => stored.push(vector),
            }
        }
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize, filter: &Metadata) -> Result<Vec<ScoredVector>> {
        let stored = self.vectors.read().map_err(|_| poisoned())?;
        let mut scored: Vec<ScoredVector> = stored
            .iter()
            .filter(|v| matches_filter(&v.metadata, filter))
            .map(|v| ScoredVector {
                id: v.id.clone(),
                score: cosine_similarity(vector, &v.values),
                metadata: Some(v.metadata.clone()),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
