use std::fmt;

use thiserror::Error;

use crate::embedding::EmbedError;
use crate::extract::ExtractError;
use crate::index::IndexError;
use crate::structure::StructureError;

/// Pipeline stage in which an ingestion failed. Reported to the caller so it
/// can distinguish bad input from transient service trouble from bad data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Extract,
    Normalize,
    Structure,
    Embed,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Extract => "extract",
            Stage::Normalize => "normalize",
            Stage::Structure => "structure",
            Stage::Embed => "embed",
            Stage::Store => "store",
        };
        f.write_str(name)
    }
}

/// Ingestion failure, tagged with the stage that produced it.
/// The caller always receives either a complete record or one of these —
/// never a partially populated record.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Document has no content after normalization")]
    EmptyContent,

    #[error("Structured extraction failed: {0}")]
    Structure(#[from] StructureError),

    #[error("Embedding generation failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Index write failed: {0}")]
    Store(#[from] IndexError),
}

impl IngestError {
    pub fn stage(&self) -> Stage {
        match self {
            IngestError::InvalidInput(_) => Stage::Input,
            IngestError::Extraction(_) => Stage::Extract,
            IngestError::EmptyContent => Stage::Normalize,
            IngestError::Structure(_) => Stage::Structure,
            IngestError::Embedding(_) => Stage::Embed,
            IngestError::Store(_) => Stage::Store,
        }
    }

    /// Human-readable reason, paired with [`Self::stage`] at the API boundary.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
