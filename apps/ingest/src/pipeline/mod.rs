//! Ingest pipeline — orchestrates extraction, normalization, structured
//! extraction, embedding, flattening, and the single index write.
//!
//! Dependencies are injected at construction; there are no process-wide
//! singletons, and a client that cannot be built fails the startup path
//! instead of being swallowed.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{Config, EmbeddingMode};
use crate::embedding::{DeterministicEmbedder, Embedder, OpenAiEmbedder};
use crate::errors::IngestError;
use crate::extract::{self, MediaType};
use crate::flatten::flatten;
use crate::index::{IndexError, MetadataFilter, ScoredEntry, VectorIndex};
use crate::llm_client::LlmClient;
use crate::models::job::JobDescriptionRecord;
use crate::normalize::normalize;
use crate::retry::RetryPolicy;
use crate::structure::{LlmStructuredExtractor, StructuredExtractor};

/// Collection holding job-description entries.
pub const JD_COLLECTION: &str = "job_descriptions";

const DEFAULT_QUERY_LIMIT: usize = 10;

/// An uploaded job-description file.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: Option<String>,
    pub media_type: String,
    pub content: Bytes,
}

/// Ingestion request. Exactly one of `document` / `raw_text` must be
/// supplied; `title` and `company_id` always override anything the model
/// infers from the text.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub title: String,
    pub company_id: String,
    pub document: Option<DocumentUpload>,
    pub raw_text: Option<String>,
}

pub struct IngestPipeline {
    extractor: Arc<dyn StructuredExtractor>,
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    retry: RetryPolicy,
}

impl IngestPipeline {
    pub fn new(
        extractor: Arc<dyn StructuredExtractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            extractor,
            embedder,
            index,
            retry,
        }
    }

    /// Wires up the production pipeline from configuration. Any client or
    /// index that cannot be initialized is a startup error.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let llm = LlmClient::new(config.anthropic_api_key.clone());
        let extractor: Arc<dyn StructuredExtractor> = Arc::new(LlmStructuredExtractor::new(llm));

        let embedder: Arc<dyn Embedder> = match config.embedding_mode {
            EmbeddingMode::Live => {
                let api_key = config
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is required for live embeddings"))?;
                Arc::new(OpenAiEmbedder::new(
                    api_key,
                    config.openai_embedding_model.clone(),
                    config.embedding_dimension,
                ))
            }
            EmbeddingMode::Deterministic => {
                Arc::new(DeterministicEmbedder::new(config.embedding_dimension))
            }
        };

        let index = Arc::new(VectorIndex::open(
            &config.index_path,
            JD_COLLECTION,
            config.embedding_dimension,
        )?);

        info!(
            "ingest pipeline initialized: mode={:?}, dimension={}",
            config.embedding_mode, config.embedding_dimension
        );

        Ok(Self::new(extractor, embedder, index, RetryPolicy::default()))
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Runs the full ingestion. On success the record is finalized and its
    /// index entry is written; on any failure nothing is persisted.
    pub async fn ingest(
        &self,
        request: IngestRequest,
    ) -> Result<JobDescriptionRecord, IngestError> {
        // 1. Input contract.
        if request.title.trim().is_empty() {
            return Err(IngestError::InvalidInput(
                "title must not be empty".to_string(),
            ));
        }
        if request.company_id.trim().is_empty() {
            return Err(IngestError::InvalidInput(
                "company_id must not be empty".to_string(),
            ));
        }

        // 2. Resolve the document source to text.
        let text = match (&request.document, &request.raw_text) {
            (Some(_), Some(_)) => {
                return Err(IngestError::InvalidInput(
                    "provide either a document or raw_text, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(IngestError::InvalidInput(
                    "either a document or raw_text must be provided".to_string(),
                ));
            }
            (Some(doc), None) => {
                // Unsupported media types are a caller error; extraction is
                // never attempted for them.
                if MediaType::parse(&doc.media_type).is_none() {
                    return Err(IngestError::InvalidInput(format!(
                        "unsupported media type: {}",
                        doc.media_type
                    )));
                }
                debug!("extracting text from {} document", doc.media_type);
                extract::extract_text(&doc.content, &doc.media_type)?
            }
            (None, Some(raw)) => raw.clone(),
        };

        // 3. Normalize; empty content is terminal.
        let normalized = normalize(&text);
        if normalized.is_empty() {
            return Err(IngestError::EmptyContent);
        }

        // 4. Identifier is pipeline-assigned, never content-derived.
        let job_id = Uuid::new_v4();
        debug!(%job_id, "ingesting job description ({} chars)", normalized.len());

        // 5 + 6. Structured extraction and embedding both consume only the
        // normalized text; run them concurrently, each under the retry
        // policy.
        let structure_fut = self
            .retry
            .run(|| self.extractor.extract_structured(&normalized));
        let embed_fut = self.retry.run(|| self.embedder.embed(&normalized));
        let (draft, embedding) = tokio::join!(structure_fut, embed_fut);
        let draft = draft?;
        let embedding = embedding?;

        let record = draft.finalize(job_id, &request.company_id, &request.title);

        // 7 + 8. Flatten and write the single index entry.
        let metadata = flatten(&record);
        self.index
            .add(job_id, normalized, embedding, metadata)
            .map_err(|e| {
                if matches!(e, IndexError::DuplicateId(_)) {
                    // Ids are freshly generated; a collision is an invariant
                    // violation, not a user-facing condition.
                    error!(%job_id, "duplicate id on freshly generated identifier");
                }
                IngestError::Store(e)
            })?;

        info!(%job_id, title = %record.title, company_id = %record.company_id,
            "job description ingested");
        Ok(record)
    }

    /// Retrieval surface: similarity query restricted to entries whose
    /// flattened `required_skills` contain `skill`.
    pub fn query_by_required_skill(
        &self,
        embedding: &[f32],
        skill: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredEntry>, IngestError> {
        let filter = MetadataFilter::new().contains("required_skills", skill);
        self.index
            .query(embedding, &filter, limit.unwrap_or(DEFAULT_QUERY_LIMIT))
            .map_err(IngestError::Store)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::embedding::EmbedError;
    use crate::errors::Stage;
    use crate::extract::DOCX_MEDIA_TYPE;
    use crate::index::MetadataValue;
    use crate::llm_client::LlmError;
    use crate::models::job::JobDraft;
    use crate::structure::StructureError;

    const DIM: usize = 16;

    /// Keyword-driven stub: infers skills from the text the way tests need,
    /// and always "infers" identity fields the caller must override.
    struct StubExtractor;

    #[async_trait]
    impl StructuredExtractor for StubExtractor {
        async fn extract_structured(&self, jd_text: &str) -> Result<JobDraft, StructureError> {
            let mut required_skills = Vec::new();
            for skill in ["Go", "distributed systems", "Kubernetes", "Python"] {
                if jd_text.contains(skill) {
                    required_skills.push(skill.to_string());
                }
            }
            Ok(JobDraft {
                company_id: Some("inferred-co".to_string()),
                title: Some("Inferred Title".to_string()),
                summary: Some(jd_text.chars().take(40).collect()),
                required_skills,
                ..JobDraft::default()
            })
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl StructuredExtractor for FailingExtractor {
        async fn extract_structured(&self, _jd_text: &str) -> Result<JobDraft, StructureError> {
            Err(StructureError::Schema {
                violations: "missing field `title`".to_string(),
            })
        }
    }

    /// Fails with a service error until `succeed_after` calls have been made.
    struct FlakyExtractor {
        calls: AtomicU32,
        succeed_after: u32,
    }

    #[async_trait]
    impl StructuredExtractor for FlakyExtractor {
        async fn extract_structured(&self, _jd_text: &str) -> Result<JobDraft, StructureError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.succeed_after {
                Err(StructureError::Service(LlmError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                }))
            } else {
                Ok(JobDraft::default())
            }
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn dimension(&self) -> usize {
            DIM
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    fn pipeline_with(
        extractor: Arc<dyn StructuredExtractor>,
        embedder: Arc<dyn Embedder>,
    ) -> IngestPipeline {
        IngestPipeline::new(
            extractor,
            embedder,
            Arc::new(VectorIndex::in_memory(DIM)),
            fast_retry(),
        )
    }

    fn stub_pipeline() -> IngestPipeline {
        pipeline_with(
            Arc::new(StubExtractor),
            Arc::new(DeterministicEmbedder::new(DIM)),
        )
    }

    fn raw_request(title: &str, company_id: &str, raw_text: &str) -> IngestRequest {
        IngestRequest {
            title: title.to_string(),
            company_id: company_id.to_string(),
            document: None,
            raw_text: Some(raw_text.to_string()),
        }
    }

    fn docx_upload(paragraphs: &[&str]) -> DocumentUpload {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        DocumentUpload {
            filename: Some("jd.docx".to_string()),
            media_type: DOCX_MEDIA_TYPE.to_string(),
            content: Bytes::from(writer.finish().unwrap().into_inner()),
        }
    }

    #[tokio::test]
    async fn test_scenario_raw_text_end_to_end() {
        let pipeline = stub_pipeline();
        let record = pipeline
            .ingest(raw_request(
                "Backend Engineer",
                "acme",
                "Senior backend engineer. Required: Go, distributed systems.",
            ))
            .await
            .unwrap();

        // Caller-supplied identity always wins over the inferred values.
        assert_eq!(record.title, "Backend Engineer");
        assert_eq!(record.company_id, "acme");
        assert!(record
            .required_skills
            .contains(&"distributed systems".to_string()));

        let entry = pipeline.index().get(record.job_id).unwrap();
        assert_eq!(
            entry.document,
            "Senior backend engineer. Required: Go, distributed systems."
        );
        assert_eq!(entry.embedding.len(), DIM);
        assert_eq!(
            entry.metadata.get("title"),
            Some(&MetadataValue::from("Backend Engineer"))
        );
    }

    #[tokio::test]
    async fn test_scenario_empty_raw_text() {
        let pipeline = stub_pipeline();
        let err = pipeline
            .ingest(raw_request("Engineer", "acme", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::EmptyContent));
        assert_eq!(err.stage(), Stage::Normalize);
        assert!(pipeline.index().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_unsupported_media_type() {
        let pipeline = stub_pipeline();
        let request = IngestRequest {
            title: "Engineer".to_string(),
            company_id: "acme".to_string(),
            document: Some(DocumentUpload {
                filename: Some("jd.png".to_string()),
                media_type: "image/png".to_string(),
                content: Bytes::from_static(b"not a document"),
            }),
            raw_text: None,
        };
        let err = pipeline.ingest(request).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Input);
        assert!(err.reason().contains("image/png"));
        assert!(pipeline.index().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_both_sources_supplied() {
        let pipeline = stub_pipeline();
        let request = IngestRequest {
            title: "Engineer".to_string(),
            company_id: "acme".to_string(),
            document: Some(docx_upload(&["some text"])),
            raw_text: Some("some text".to_string()),
        };
        let err = pipeline.ingest(request).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Input);
        assert!(pipeline.index().is_empty());
    }

    #[tokio::test]
    async fn test_neither_source_supplied() {
        let pipeline = stub_pipeline();
        let request = IngestRequest {
            title: "Engineer".to_string(),
            company_id: "acme".to_string(),
            document: None,
            raw_text: None,
        };
        let err = pipeline.ingest(request).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Input);
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let pipeline = stub_pipeline();
        let err = pipeline
            .ingest(raw_request("  ", "acme", "some text"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Input);
        assert!(err.reason().contains("title"));
    }

    #[tokio::test]
    async fn test_docx_document_end_to_end() {
        let pipeline = stub_pipeline();
        let request = IngestRequest {
            title: "Platform Engineer".to_string(),
            company_id: "acme".to_string(),
            document: Some(docx_upload(&[
                "Platform team, Kubernetes required.",
                "",
                "Own the cluster fleet.",
            ])),
            raw_text: None,
        };
        let record = pipeline.ingest(request).await.unwrap();
        assert!(record.required_skills.contains(&"Kubernetes".to_string()));

        let entry = pipeline.index().get(record.job_id).unwrap();
        assert_eq!(
            entry.document,
            "Platform team, Kubernetes required. Own the cluster fleet."
        );
    }

    #[tokio::test]
    async fn test_corrupt_document_fails_at_extract_stage() {
        let pipeline = stub_pipeline();
        let request = IngestRequest {
            title: "Engineer".to_string(),
            company_id: "acme".to_string(),
            document: Some(DocumentUpload {
                filename: None,
                media_type: DOCX_MEDIA_TYPE.to_string(),
                content: Bytes::from_static(b"not a zip archive"),
            }),
            raw_text: None,
        };
        let err = pipeline.ingest(request).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Extract);
        assert!(pipeline.index().is_empty());
    }

    #[tokio::test]
    async fn test_structure_failure_writes_nothing() {
        let pipeline = pipeline_with(
            Arc::new(FailingExtractor),
            Arc::new(DeterministicEmbedder::new(DIM)),
        );
        let err = pipeline
            .ingest(raw_request("Engineer", "acme", "some text"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Structure);
        assert!(err.reason().contains("missing field"));
        assert!(pipeline.index().is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_writes_nothing() {
        let pipeline = pipeline_with(Arc::new(StubExtractor), Arc::new(FailingEmbedder));
        let err = pipeline
            .ingest(raw_request("Engineer", "acme", "some text"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Embed);
        assert!(pipeline.index().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_writes_nothing() {
        // Index expecting a different dimension than the embedder produces.
        let pipeline = IngestPipeline::new(
            Arc::new(StubExtractor),
            Arc::new(DeterministicEmbedder::new(DIM)),
            Arc::new(VectorIndex::in_memory(DIM + 1)),
            fast_retry(),
        );
        let err = pipeline
            .ingest(raw_request("Engineer", "acme", "some text"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Store);
        assert!(pipeline.index().is_empty());
    }

    #[tokio::test]
    async fn test_transient_structure_failure_retried_to_success() {
        let extractor = Arc::new(FlakyExtractor {
            calls: AtomicU32::new(0),
            succeed_after: 2,
        });
        let pipeline = pipeline_with(
            Arc::clone(&extractor) as Arc<dyn StructuredExtractor>,
            Arc::new(DeterministicEmbedder::new(DIM)),
        );
        let record = pipeline
            .ingest(raw_request("Engineer", "acme", "some text"))
            .await
            .unwrap();
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);
        assert!(pipeline.index().get(record.job_id).is_some());
    }

    #[tokio::test]
    async fn test_retry_exhaustion_surfaces_last_error() {
        let extractor = Arc::new(FlakyExtractor {
            calls: AtomicU32::new(0),
            succeed_after: u32::MAX,
        });
        let pipeline = pipeline_with(
            Arc::clone(&extractor) as Arc<dyn StructuredExtractor>,
            Arc::new(DeterministicEmbedder::new(DIM)),
        );
        let err = pipeline
            .ingest(raw_request("Engineer", "acme", "some text"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Structure);
        assert!(err.reason().contains("503"));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);
        assert!(pipeline.index().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_ingestion_produces_distinct_records() {
        let pipeline = stub_pipeline();
        let request = raw_request("Engineer", "acme", "identical content");
        let first = pipeline.ingest(request.clone()).await.unwrap();
        let second = pipeline.ingest(request).await.unwrap();
        assert_ne!(first.job_id, second.job_id);
        assert_eq!(pipeline.index().len(), 2);
    }

    #[tokio::test]
    async fn test_query_by_required_skill_filters() {
        let pipeline = stub_pipeline();
        let with = pipeline
            .ingest(raw_request(
                "Platform Engineer",
                "acme",
                "Platform role. Required: Kubernetes, Go.",
            ))
            .await
            .unwrap();
        pipeline
            .ingest(raw_request(
                "Data Engineer",
                "acme",
                "Data role. Required: Python.",
            ))
            .await
            .unwrap();

        let embedder = DeterministicEmbedder::new(DIM);
        let query_vector = embedder.embed("Platform role. Required: Kubernetes, Go.")
            .await
            .unwrap();
        let hits = pipeline
            .query_by_required_skill(&query_vector, "Kubernetes", None)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, with.job_id);
    }
}
