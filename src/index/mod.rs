// Exact nearest-neighbor index over the knowledge-base corpus

#[cfg(test)]
mod tests;

use thiserror::Error;
use tracing::{debug, info};

use crate::corpus::Document;
use crate::embeddings::Embedder;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Cannot build an index from an empty corpus")]
    EmptyCorpus,
    #[error("Embedding dimension mismatch at document {position}: expected {expected}, found {found}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        position: usize,
    },
    #[error("Index has not been built")]
    NotBuilt,
    #[error("k must be at least 1")]
    InvalidK,
    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),
}

/// A retrieved document and its squared Euclidean distance to the query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub document: &'a Document,
    pub distance: f32,
}

/// Immutable corpus with one embedding row per document.
///
/// Row `i` always belongs to document `i`; every row has `dimension` values.
#[derive(Debug)]
struct BuiltIndex {
    documents: Vec<Document>,
    embeddings: Vec<Vec<f32>>,
    dimension: usize,
}

/// Brute-force vector index.
///
/// Search is exhaustive and deterministic: equal distances are ordered by
/// position in the corpus.
#[derive(Debug, Default)]
pub struct VectorIndex {
    built: Option<BuiltIndex>,
}

impl VectorIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and return a ready index in one step
    #[inline]
    pub fn from_corpus(corpus: Vec<Document>, embedder: &dyn Embedder) -> Result<Self, IndexError> {
        let mut index = Self::new();
        index.build(corpus, embedder)?;
        Ok(index)
    }

    /// Embed every document that lacks an embedding and store the corpus.
    ///
    /// On error the index keeps whatever state it had before the call.
    #[inline]
    pub fn build(&mut self, corpus: Vec<Document>, embedder: &dyn Embedder) -> Result<(), IndexError> {
        if corpus.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let mut documents = corpus;
        let mut embeddings = Vec::with_capacity(documents.len());
        let mut computed = 0usize;

        for document in &mut documents {
            let embedding = match document.embedding.take() {
                Some(embedding) => embedding,
                None => {
                    computed += 1;
                    embedder
                        .embed(&document.content)
                        .map_err(IndexError::Embedding)?
                }
            };
            embeddings.push(embedding);
        }

        let dimension = embeddings.first().map_or(0, Vec::len);
        for (position, row) in embeddings.iter().enumerate() {
            if row.len() != dimension || row.is_empty() {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    found: row.len(),
                    position,
                });
            }
        }

        info!(
            "Built vector index with {} documents ({} embedded, {} dimensions)",
            documents.len(),
            computed,
            dimension
        );

        self.built = Some(BuiltIndex {
            documents,
            embeddings,
            dimension,
        });
        Ok(())
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.built.as_ref().map_or(0, |b| b.documents.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.built.as_ref().map(|b| b.dimension)
    }

    #[inline]
    pub fn documents(&self) -> &[Document] {
        self.built
            .as_ref()
            .map(|b| b.documents.as_slice())
            .unwrap_or_default()
    }

    /// Embedding rows in corpus order, for persisting
    #[inline]
    pub fn embeddings(&self) -> &[Vec<f32>] {
        self.built
            .as_ref()
            .map(|b| b.embeddings.as_slice())
            .unwrap_or_default()
    }

    /// Embed `query` and return the `k` closest documents
    #[inline]
    pub fn search(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<SearchHit<'_>>, IndexError> {
        if self.built.is_none() {
            return Err(IndexError::NotBuilt);
        }
        if k == 0 {
            return Err(IndexError::InvalidK);
        }

        let query_vector = embedder.embed(query).map_err(IndexError::Embedding)?;
        self.search_vector(&query_vector, k)
    }

    /// Return the `k` documents closest to an already embedded query
    #[inline]
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<'_>>, IndexError> {
        let built = self.built.as_ref().ok_or(IndexError::NotBuilt)?;
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        if query.len() != built.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: built.dimension,
                found: query.len(),
                position: 0,
            });
        }

        let mut scored: Vec<(usize, f32)> = built
            .embeddings
            .iter()
            .map(|row| squared_euclidean(row, query))
            .enumerate()
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        debug!(
            "Vector search returned {} hits (best distance {:?})",
            scored.len(),
            scored.first().map(|(_, d)| *d)
        );

        Ok(scored
            .into_iter()
            .map(|(position, distance)| SearchHit {
                document: &built.documents[position],
                distance,
            })
            .collect())
    }
}

#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
