//! Job-description ingestion pipeline and retrieval index.
//!
//! Converts unstructured job-description documents (PDF, DOCX, or raw text)
//! into a structured [`models::job::JobDescriptionRecord`], computes a
//! semantic embedding, and persists text + flat metadata in a vector index
//! queryable by similarity plus metadata filters.
//!
//! The HTTP/CRUD layer lives outside this crate; it drives the pipeline
//! through [`pipeline::IngestPipeline`] and the boundary types in
//! [`pipeline`] and [`errors`].

pub mod config;
pub mod embedding;
pub mod errors;
pub mod extract;
pub mod flatten;
pub mod index;
pub mod llm_client;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod structure;

pub use config::{Config, EmbeddingMode};
pub use errors::{IngestError, Stage};
pub use models::job::{JobDescriptionRecord, JobDraft};
pub use pipeline::{DocumentUpload, IngestPipeline, IngestRequest};
