use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Embedding backend selection. An explicit configuration choice: the
/// deterministic backend is never used as a silent fallback when the live
/// service is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMode {
    /// Call the OpenAI embeddings API.
    Live,
    /// Hash-seeded vectors, reproducible without network access.
    Deterministic,
}

impl EmbeddingMode {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "live" => Ok(EmbeddingMode::Live),
            "deterministic" => Ok(EmbeddingMode::Deterministic),
            other => bail!("EMBEDDING_MODE must be 'live' or 'deterministic', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Required when `embedding_mode` is [`EmbeddingMode::Live`].
    pub openai_api_key: Option<String>,
    pub embedding_mode: EmbeddingMode,
    pub embedding_dimension: usize,
    pub openai_embedding_model: String,
    /// Root directory for vector index collections.
    pub index_path: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let embedding_mode = EmbeddingMode::parse(
            &std::env::var("EMBEDDING_MODE").unwrap_or_else(|_| "live".to_string()),
        )?;

        let openai_api_key = match embedding_mode {
            EmbeddingMode::Live => Some(require_env("OPENAI_API_KEY")?),
            EmbeddingMode::Deterministic => std::env::var("OPENAI_API_KEY").ok(),
        };

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            openai_api_key,
            embedding_mode,
            embedding_dimension: std::env::var("EMBEDDING_DIM")
                .unwrap_or_else(|_| "1536".to_string())
                .parse::<usize>()
                .context("EMBEDDING_DIM must be a positive integer")?,
            openai_embedding_model: std::env::var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            index_path: PathBuf::from(
                std::env::var("INDEX_PATH").unwrap_or_else(|_| "./jd_index".to_string()),
            ),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
