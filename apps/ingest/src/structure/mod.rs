//! Structured extraction — turns normalized job-description text into a
//! [`JobDraft`] via a schema-constrained LLM call.

pub mod prompts;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm_client::{LlmClient, LlmError};
use crate::models::job::JobDraft;
use crate::structure::prompts::{JD_EXTRACT_PROMPT_TEMPLATE, JD_EXTRACT_SYSTEM};

/// Structured-extraction failure, split so the orchestrator can tell a
/// schema problem (needs different input after retries run out) from a
/// transport problem (safe to retry the whole ingestion).
#[derive(Debug, Error)]
pub enum StructureError {
    /// The model produced output that does not conform to the schema.
    #[error("Schema validation failed: {violations}")]
    Schema { violations: String },

    /// The model service was unreachable or returned an error.
    #[error("LLM service error: {0}")]
    Service(LlmError),
}

/// The structured extractor seam. Held by the pipeline as an
/// `Arc<dyn StructuredExtractor>` so tests can substitute a stub for the
/// live LLM backend.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Extracts a draft record from normalized text. Single attempt — the
    /// caller owns retries. Does not assign `job_id`.
    async fn extract_structured(&self, jd_text: &str) -> Result<JobDraft, StructureError>;
}

/// Production extractor backed by the Claude API.
pub struct LlmStructuredExtractor {
    llm: LlmClient,
    instructions: String,
}

impl LlmStructuredExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self::with_instructions(llm, JD_EXTRACT_SYSTEM)
    }

    /// Overrides the system instructions sent with every extraction call.
    pub fn with_instructions(llm: LlmClient, instructions: impl Into<String>) -> Self {
        Self {
            llm,
            instructions: instructions.into(),
        }
    }
}

#[async_trait]
impl StructuredExtractor for LlmStructuredExtractor {
    async fn extract_structured(&self, jd_text: &str) -> Result<JobDraft, StructureError> {
        let prompt = JD_EXTRACT_PROMPT_TEMPLATE.replace("{jd_text}", jd_text);
        match self.llm.call_json::<JobDraft>(&prompt, &self.instructions).await {
            Ok(draft) => Ok(draft),
            // A parse failure means the model answered but off-schema.
            Err(LlmError::Parse(e)) => Err(StructureError::Schema {
                violations: e.to_string(),
            }),
            Err(e) => Err(StructureError::Service(e)),
        }
    }
}
