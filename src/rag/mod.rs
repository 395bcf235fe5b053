//! Similar-passage retrieval over a vector index
//!
//! `RagClient` pairs an [`Embedder`] with a [`VectorIndex`]: records are
//! embedded and upserted, queries are embedded and matched, and matches
//! are flattened into [`Passage`]s.

pub mod embedder;
pub mod index;

pub use embedder::{Embedder, OpenAiEmbedder};
pub use index::{MemoryIndex, Metadata, PineconeIndex, ScoredVector, Vector, VectorIndex};

use crate::config::Config;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// A passage to index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Stable id; derived from the text when absent
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Record {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Explicit id, or the hex SHA-256 of the text
    pub fn resolved_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{:x}", Sha256::digest(self.text.as_bytes())),
        }
    }
}

/// A retrieved passage, flattened from match metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub verbatim: String,
    pub title: String,
    pub source_url: String,
    pub jurisdiction: String,
    pub standard: String,
    pub score: f32,
}

impl From<ScoredVector> for Passage {
    fn from(hit: ScoredVector) -> Self {
        let md = hit.metadata.unwrap_or_default();
        let field = |key: &str| -> String {
            md.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let verbatim = md
            .get("verbatim")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| md.get("text").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        Passage {
            verbatim,
            title: field("title"),
            source_url: field("source_url"),
            jurisdiction: field("jurisdiction"),
            standard: field("standard"),
            score: hit.score,
        }
    }
}

pub struct RagClient {
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
}

impl RagClient {
    pub fn new(embedder: Box<dyn Embedder>, index: Box<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Hosted embeddings plus the configured Pinecone index
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = OpenAiEmbedder::from_config(config)?;
        let index = PineconeIndex::connect(config).await?;
        Ok(Self::new(Box::new(embedder), Box::new(index)))
    }

    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await
    }

    /// Embed every record concurrently, then upsert them in one call
    pub async fn upsert(&self, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        info!(
            "Embedding {} records with {} for index {}",
            records.len(),
            self.embedder.model(),
            self.index.name()
        );

        let futures: Vec<_> = records.iter().map(|r| self.embedder.embed(&r.text)).collect();
        let embeddings = futures::future::join_all(futures).await;

        let mut vectors = Vec::with_capacity(records.len());
        for (record, embedding) in records.iter().zip(embeddings) {
            let mut metadata = record.metadata.clone();
            metadata
                .entry("text".to_string())
                .or_insert_with(|| Value::String(record.text.clone()));
            vectors.push(Vector {
                id: record.resolved_id(),
                values: embedding?,
                metadata,
            });
        }

        self.index.upsert(vectors).await
    }

    /// Top `k` passages similar to `query`
    pub async fn search(&self, query: &str, filter: &Metadata, k: usize) -> Result<Vec<Passage>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.index.query(&vector, k, filter).await?;
        debug!("{} matches for query ({} chars)", hits.len(), query.len());
        Ok(hits.into_iter().map(Passage::from).collect())
    }
}
