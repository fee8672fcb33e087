//! Embedding generation — maps normalized text to a fixed-dimension vector.
//!
//! Two backends behind one trait: a live OpenAI embeddings client and a
//! hash-seeded deterministic generator for tests and offline runs. Which one
//! is used is an explicit configuration choice, never a fallback.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Cannot embed empty text")]
    EmptyText,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding has wrong dimension: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// The embedding seam. Held by the pipeline as an `Arc<dyn Embedder>`.
///
/// Implementations must return vectors of exactly `dimension()` components
/// or an error — never a partially filled vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Live embedder backed by the OpenAI embeddings API.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String, dimension: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            model,
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyText);
        }

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .unwrap_or_default();

        if vector.len() != self.dimension {
            return Err(EmbedError::Dimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        debug!("embedding generated: model={}, dim={}", self.model, vector.len());
        Ok(vector)
    }
}

/// Deterministic embedder: seeds a ChaCha RNG from a hash of the text and
/// draws `dimension` values in [0, 1). Identical text always produces a
/// bit-identical vector, which makes pipeline tests reproducible without a
/// live model.
pub struct DeterministicEmbedder {
    dimension: usize,
}

impl DeterministicEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyText);
        }

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut rng = ChaCha8Rng::seed_from_u64(hasher.finish());

        Ok((0..self.dimension).map(|_| rng.gen::<f32>()).collect())
    }
}
