// Embeddings module
// The embedding capability plus its Ollama-backed and offline implementations

pub mod hashing;
pub mod ollama;

pub use hashing::HashingEmbedder;
pub use ollama::OllamaClient;

/// Turns text into a fixed-length vector.
///
/// Implementations must be deterministic for the lifetime of an index:
/// the same text always yields the same vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Identifies the model so persisted embeddings can be matched to it
    fn model(&self) -> &str;
}
