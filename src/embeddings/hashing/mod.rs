
use std::hash::Hasher;
use twox_hash::XxHash64;

use super::Embedder;

/// Model ids are this prefix plus the dimension, e.g. `hashing-bag-of-words-768`
pub const HASHING_MODEL_PREFIX: &str = "hashing-bag-of-words";

/// Offline embedder hashing lowercased word tokens into fixed buckets.
///
/// Vectors are L2-normalized, so identical token bags map to identical
/// vectors and a document's own content is always its nearest neighbor.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model: String,
}

impl HashingEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model: format!("{HASHING_MODEL_PREFIX}-{dimension}"),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        let hash = hasher.finish();
        let index = usize::try_from(hash % self.dimension as u64).unwrap_or(0);
        // High bit picks the sign so unrelated tokens tend to cancel out
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dimension];

        for token in tokenize(text) {
            let (index, sign) = self.bucket(&token);
            vector[index] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }

        Ok(vector)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}
