// Knowledge-base corpus
// Loads grammar-rule documents and the optional precomputed embeddings file


use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// French grammar rules shipped with the crate
pub const BUNDLED_CORPUS: &str = include_str!("../../data/grammar_knowledge_base.json");

/// A single knowledge-base entry.
///
/// `topic` labels the kind of mistake the rule addresses and is what gets
/// attributed to a learner's profile when the rule is retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u32,
    pub content: String,
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    #[inline]
    pub fn new(id: u32, content: impl Into<String>, topic: Option<&str>) -> Self {
        Self {
            id,
            content: content.into(),
            topic: topic.map(str::to_string),
            embedding: None,
        }
    }
}

/// On-disk record; a missing `id` becomes the first free id at or after the record's position
#[derive(Debug, Deserialize)]
struct CorpusRecord {
    id: Option<u32>,
    content: String,
    #[serde(default)]
    topic: Option<String>,
}

/// Persisted embeddings, one row per document in corpus order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsCache {
    pub model: String,
    pub dimension: usize,
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Corpus record {position} has empty content")]
    EmptyContent { position: usize },
    #[error("Corpus record {position} reuses id {id}")]
    DuplicateId { position: usize, id: u32 },
}

/// Load the corpus from a JSON array of `{id?, content, topic?}` records
#[inline]
pub fn load_corpus(path: &Path) -> Result<Vec<Document>, CorpusError> {
    debug!("Loading corpus from {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records: Vec<CorpusRecord> =
        serde_json::from_str(&content).map_err(|source| CorpusError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let documents = documents_from_records(records)?;
    info!("Loaded {} corpus documents", documents.len());
    Ok(documents)
}

fn documents_from_records(records: Vec<CorpusRecord>) -> Result<Vec<Document>, CorpusError> {
    let mut taken = HashSet::with_capacity(records.len());

    for (position, record) in records.iter().enumerate() {
        if record.content.trim().is_empty() {
            return Err(CorpusError::EmptyContent { position });
        }
        if let Some(id) = record.id {
            if !taken.insert(id) {
                return Err(CorpusError::DuplicateId { position, id });
            }
        }
    }

    let mut documents = Vec::with_capacity(records.len());
    for (position, record) in records.into_iter().enumerate() {
        // Implicit ids start at the record's position and skip ids already in use
        let id = match record.id {
            Some(id) => id,
            None => {
                let mut candidate = u32::try_from(position).unwrap_or(u32::MAX);
                while !taken.insert(candidate) {
                    candidate = candidate.wrapping_add(1);
                }
                candidate
            }
        };

        let topic = record
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        documents.push(Document {
            id,
            content: record.content,
            topic,
            embedding: None,
        });
    }

    Ok(documents)
}

/// Write the bundled knowledge base to `path` unless a corpus is already there.
///
/// Returns whether the file was written.
#[inline]
pub fn install_bundled_corpus(path: &Path) -> Result<bool, CorpusError> {
    if path.exists() {
        debug!("Corpus already present at {}", path.display());
        return Ok(false);
    }

    let io_error = |source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, BUNDLED_CORPUS).map_err(io_error)?;

    info!("Installed bundled knowledge base at {}", path.display());
    Ok(true)
}

/// Read the embeddings cache, returning `None` when the file does not exist
#[inline]
pub fn load_embeddings_cache(path: &Path) -> Result<Option<EmbeddingsCache>, CorpusError> {
    if !path.exists() {
        debug!("No embeddings cache at {}", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let cache = serde_json::from_str(&content).map_err(|source| CorpusError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(cache))
}

#[inline]
pub fn save_embeddings_cache(path: &Path, cache: &EmbeddingsCache) -> Result<(), CorpusError> {
    let io_error = |source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let content = serde_json::to_string(cache).map_err(|source| CorpusError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, content).map_err(io_error)?;
    info!(
        "Saved {} embeddings ({} dimensions) to {}",
        cache.embeddings.len(),
        cache.dimension,
        path.display()
    );
    Ok(())
}

/// Attach cached embeddings to the documents they were computed for.
///
/// Returns `false` and leaves the documents untouched when the cache does not
/// line up with the corpus; the index then computes embeddings itself.
#[inline]
pub fn apply_embeddings_cache(documents: &mut [Document], cache: &EmbeddingsCache) -> bool {
    if cache.embeddings.len() != documents.len() {
        warn!(
            "Embeddings cache has {} rows but corpus has {} documents, ignoring cache",
            cache.embeddings.len(),
            documents.len()
        );
        return false;
    }

    if cache.embeddings.iter().any(|row| row.len() != cache.dimension) {
        warn!(
            "Embeddings cache rows are not all {} dimensions, ignoring cache",
            cache.dimension
        );
        return false;
    }

    for (document, row) in documents.iter_mut().zip(&cache.embeddings) {
        document.embedding = Some(row.clone());
    }

    debug!("Applied {} cached embeddings", documents.len());
    true
}
