//! Text embedding via the hosted embeddings endpoint

use crate::config::{api_key, Config};
use crate::error::{ApiError, Error, Result};
use crate::http::{self, RetryPolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERVICE: &str = "openai-embeddings";

/// Turns text into a unit-length vector
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, for logging
    fn model(&self) -> &str;
}

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingData {
    pub embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Build from config; requires `OPENAI_API_KEY`
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = api_key("OPENAI_API_KEY").ok_or_else(|| {
            Error::Api(ApiError::MissingCredential {
                service: SERVICE.to_string(),
                hint: "set OPENAI_API_KEY".to_string(),
            })
        })?;
        Ok(Self {
            client: http::client(&config.http)?,
            api_key: key,
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            model: config.openai.embedding_model.clone(),
            retry: RetryPolicy::from(&config.http),
        })
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| http::transport_error(SERVICE, e))?;

        let body: EmbeddingResponse = http::json_body(SERVICE, response).await?;
        first_embedding(body)
    }
}

pub(crate) fn first_embedding(body: EmbeddingResponse) -> Result<Vec<f32>> {
    body.data
        .into_iter()
        .next()
        .map(|d| normalize(d.embedding))
        .ok_or_else(|| {
            Error::Api(ApiError::InvalidResponse {
                service: SERVICE.to_string(),
                details: "response contained no embeddings".to_string(),
            })
        })
}

/// Scale to unit L2 norm; the zero vector is returned unchanged
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Embedding {} chars with {}", text.len(), self.model);
        http::with_retry(SERVICE, &self.retry, move || self.embed_once(text)).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let v = normalize(vec![3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_parse_response() {
        let body: EmbeddingResponse = serde_json::from_str(
            r#"{"object": "list", "data": [{"object": "embedding", "index": 0, "embedding": [0.0, 2.0]}], "model": "m"}"#,
        )
        .unwrap();
        assert_eq!(first_embedding(body).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_empty_response_is_invalid() {
        let body: EmbeddingResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        let err = first_embedding(body).unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::InvalidResponse { .. })));
    }
}
