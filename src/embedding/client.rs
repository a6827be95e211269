use crate::config::EmbeddingEndpoint;
use crate::error::{PackagingError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// The one embedding model used for every packaged tool.
pub const MODEL_NAME: &str = "snowflake-arctic-embed:xs";

/// Vector length produced by [`MODEL_NAME`].
pub const EMBEDDING_DIMENSION: usize = 384;

/// Value every element of the offline stub vector carries.
pub const DEBUG_EMBEDDING_VALUE: f64 = 0.1;

pub type EmbeddingVector = Vec<f64>;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response body of `POST /api/embeddings`.
///
/// `embedding` is the canonical key. Some server versions answer with
/// `embeddings` instead, sometimes as a batch (`[[...]]`).
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Option<Vec<f64>>,
    embeddings: Option<Value>,
}

/// Client for the embedding endpoint.
///
/// Issues one request per prompt and never retries; retry policy belongs
/// to the caller.
pub struct EmbeddingClient {
    endpoint: EmbeddingEndpoint,
    http: reqwest::Client,
}

impl EmbeddingClient {
    pub fn new(endpoint: EmbeddingEndpoint, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PackagingError::EmbeddingFetch(format!("HTTP client setup: {}", e)))?;

        match &endpoint {
            EmbeddingEndpoint::Debug => {
                tracing::info!("Embedding client in debug mode, using stub vectors")
            }
            EmbeddingEndpoint::Remote(url) => {
                tracing::info!(endpoint = %url, model = MODEL_NAME, "Embedding client configured")
            }
        }

        Ok(Self { endpoint, http })
    }

    /// Client that never performs I/O.
    pub fn debug() -> Result<Self> {
        Self::new(EmbeddingEndpoint::Debug, Duration::from_secs(30))
    }

    pub fn model_name(&self) -> &'static str {
        MODEL_NAME
    }

    /// Turn `prompt` into an embedding vector of [`EMBEDDING_DIMENSION`] floats.
    pub async fn get_embeddings(&self, prompt: &str) -> Result<EmbeddingVector> {
        if prompt.trim().is_empty() {
            return Err(PackagingError::EmbeddingFetch(
                "prompt cannot be empty".to_string(),
            ));
        }

        let base_url = match &self.endpoint {
            EmbeddingEndpoint::Debug => {
                tracing::debug!("Returning stub embeddings (debug mode)");
                return Ok(vec![DEBUG_EMBEDDING_VALUE; EMBEDDING_DIMENSION]);
            }
            EmbeddingEndpoint::Remote(url) => url,
        };

        let url = format!("{}/api/embeddings", base_url);
        let start = Instant::now();
        tracing::debug!(url = %url, prompt_len = prompt.len(), "Requesting embeddings");

        let response = self
            .http
            .post(&url)
            .json(&EmbeddingRequest {
                model: MODEL_NAME,
                prompt,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PackagingError::EmbeddingFetch(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }

        let body = response.text().await?;
        let embedding = parse_embedding_body(&body)?;

        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            dimension = embedding.len(),
            "Embeddings received"
        );
        Ok(embedding)
    }
}

/// Extract the embedding vector from a response body and check its length.
pub fn parse_embedding_body(body: &str) -> Result<EmbeddingVector> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| PackagingError::EmbeddingFetch(format!("malformed response body: {}", e)))?;

    let embedding = match (response.embedding, response.embeddings) {
        (Some(embedding), _) => embedding,
        (None, Some(alternate)) => {
            tracing::warn!("Embedding endpoint answered with 'embeddings' instead of 'embedding'");
            from_alternate_key(alternate)?
        }
        (None, None) => {
            return Err(PackagingError::EmbeddingFetch(
                "response has no 'embedding' array".to_string(),
            ))
        }
    };

    if embedding.len() != EMBEDDING_DIMENSION {
        return Err(PackagingError::EmbeddingFetch(format!(
            "expected {} dimensions for {}, got {}",
            EMBEDDING_DIMENSION,
            MODEL_NAME,
            embedding.len()
        )));
    }
    Ok(embedding)
}

fn from_alternate_key(value: Value) -> Result<EmbeddingVector> {
    // Batch shape: take the single row.
    let value = match value {
        Value::Array(mut rows) if rows.first().is_some_and(Value::is_array) => {
            if rows.len() != 1 {
                return Err(PackagingError::EmbeddingFetch(format!(
                    "expected one embedding, got {}",
                    rows.len()
                )));
            }
            rows.swap_remove(0)
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|e| {
        PackagingError::EmbeddingFetch(format!("'embeddings' is not a numeric array: {}", e))
    })
}
