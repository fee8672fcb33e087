//! Embedded vector index: maps a job id to (document text, embedding, flat
//! metadata) and answers cosine-similarity queries with metadata filters.
//!
//! One collection is one directory; each entry is one JSON file written via
//! a temp file + atomic rename, so readers never observe a partially
//! written entry. The in-memory map behind a `RwLock` is the query path;
//! the files are the durable copy loaded at open.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IndexError {
    /// An entry with this id already exists. Never silently overwritten.
    #[error("Duplicate id: {0}")]
    DuplicateId(Uuid),

    #[error("Vector has wrong dimension: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Index I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Index serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Scalar metadata value. List-valued record fields are stored as a single
/// newline-joined string; absent optionals as the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// Conjunction of predicates over flat metadata. An empty filter matches
/// every entry.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone)]
enum Predicate {
    Equals { field: String, value: MetadataValue },
    Contains { field: String, needle: String },
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match predicate on a field.
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.predicates.push(Predicate::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Substring-containment predicate on a string field — the way to match
    /// one element of a newline-joined list field.
    pub fn contains(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Contains {
            field: field.into(),
            needle: needle.into(),
        });
        self
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.predicates.iter().all(|p| match p {
            Predicate::Equals { field, value } => metadata.get(field) == Some(value),
            Predicate::Contains { field, needle } => metadata
                .get(field)
                .and_then(MetadataValue::as_str)
                .is_some_and(|s| s.contains(needle.as_str())),
        })
    }
}

/// One stored entry. `seq` records insertion order and breaks ranking ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: Uuid,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    pub ingested_at: DateTime<Utc>,
    pub seq: u64,
}

/// A query hit: the entry plus its cosine similarity to the query vector.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: IndexEntry,
    pub score: f32,
}

struct IndexState {
    entries: HashMap<Uuid, IndexEntry>,
    next_seq: u64,
}

/// A single named collection of entries sharing one embedding dimension.
pub struct VectorIndex {
    dimension: usize,
    dir: Option<PathBuf>,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Opens (or creates) the collection directory under `root` and loads
    /// every persisted entry.
    pub fn open(
        root: impl AsRef<Path>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self, IndexError> {
        let dir = root.as_ref().join(collection);
        fs::create_dir_all(&dir)?;

        let mut entries = HashMap::new();
        let mut next_seq = 0u64;
        for dir_entry in fs::read_dir(&dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let file = fs::File::open(&path)?;
            let entry: IndexEntry = serde_json::from_reader(io::BufReader::new(file))?;
            next_seq = next_seq.max(entry.seq + 1);
            entries.insert(entry.id, entry);
        }

        info!(
            "vector index '{}' opened: {} entries, dimension {}",
            collection,
            entries.len(),
            dimension
        );

        Ok(Self {
            dimension,
            dir: Some(dir),
            state: RwLock::new(IndexState { entries, next_seq }),
        })
    }

    /// Volatile index with no backing files. Used in tests and by callers
    /// that manage durability elsewhere.
    pub fn in_memory(dimension: usize) -> Self {
        Self {
            dimension,
            dir: None,
            state: RwLock::new(IndexState {
                entries: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores an entry. Rejects ids that already exist and vectors whose
    /// dimension differs from the collection's.
    pub fn add(
        &self,
        id: Uuid,
        document: String,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<(), IndexError> {
        if embedding.len() != self.dimension {
            return Err(IndexError::Dimension {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let mut state = self.state.write();
        if state.entries.contains_key(&id) {
            return Err(IndexError::DuplicateId(id));
        }

        let entry = IndexEntry {
            id,
            document,
            embedding,
            metadata,
            ingested_at: Utc::now(),
            seq: state.next_seq,
        };

        if let Some(dir) = &self.dir {
            persist_entry(dir, &entry)?;
        }

        state.next_seq += 1;
        state.entries.insert(id, entry);
        debug!("index add: id={id}");
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<IndexEntry> {
        self.state.read().entries.get(&id).cloned()
    }

    /// Similarity query: entries matching `filter`, ranked nearest-first by
    /// cosine similarity, ties broken by insertion order.
    pub fn query(
        &self,
        embedding: &[f32],
        filter: &MetadataFilter,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, IndexError> {
        if embedding.len() != self.dimension {
            return Err(IndexError::Dimension {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let state = self.state.read();
        let mut hits: Vec<ScoredEntry> = state
            .entries
            .values()
            .filter(|e| filter.matches(&e.metadata))
            .map(|e| ScoredEntry {
                score: cosine_similarity(embedding, &e.embedding),
                entry: e.clone(),
            })
            .collect();
        drop(state);

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.entry.seq.cmp(&b.entry.seq))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Atomic persist: write to a temp file in the collection directory, then
/// rename over the final path.
fn persist_entry(dir: &Path, entry: &IndexEntry) -> Result<(), IndexError> {
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(tmp.as_file(), entry)?;
    tmp.persist(dir.join(format!("{}.json", entry.id)))
        .map_err(|e| IndexError::Io(e.error))?;
    Ok(())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
