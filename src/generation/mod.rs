// Generation capability
// Contract for the language model and parsing of its structured reply


use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Correction the model returns when it finds nothing to fix
pub const NO_ERROR_SENTINEL: &str = "Sentence appears correct.";

/// Structured reply of the generation capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub correction: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub topic: Option<String>,
}

impl Generation {
    /// Whether the model reported an actual mistake
    #[inline]
    pub fn found_error(&self) -> bool {
        self.correction.trim() != NO_ERROR_SENTINEL
    }
}

/// Produces a correction for a fully rendered prompt.
///
/// Implementations own their retry and timeout policy; callers never retry.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<Generation>;
}

/// Parse a model reply into a [`Generation`].
///
/// Accepts either a bare JSON object or free text wrapping one, in which
/// case the outermost `{...}` span is used.
#[inline]
pub fn parse_generation(text: &str) -> Result<Generation> {
    let trimmed = text.trim();

    let generation: Generation = match serde_json::from_str(trimmed) {
        Ok(generation) => generation,
        Err(_) => {
            let start = trimmed
                .find('{')
                .ok_or_else(|| anyhow!("Model reply contains no JSON object"))?;
            let end = trimmed
                .rfind('}')
                .filter(|end| *end > start)
                .ok_or_else(|| anyhow!("Model reply contains an unterminated JSON object"))?;
            let object = trimmed
                .get(start..=end)
                .ok_or_else(|| anyhow!("Model reply has a malformed JSON span"))?;
            serde_json::from_str(object).context("Failed to parse JSON object in model reply")?
        }
    };

    if generation.correction.trim().is_empty() {
        return Err(anyhow!("Model reply has an empty correction"));
    }

    Ok(Generation {
        topic: generation
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        ..generation
    })
}
