// Prompt rendering for the generation capability

#[cfg(test)]
mod tests;

use thiserror::Error;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an expert French language tutor. Analyze the user's sentence using the provided context.
Provide a correction and a helpful, encouraging explanation.
Respond with a JSON object with the keys \"correction\", \"explanation\" and \"topic\".
If the sentence has no mistakes, use \"Sentence appears correct.\" as the correction.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Sentence cannot be empty")]
    EmptySentence,
}

/// Renders the role-delimited prompt
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_instruction: String,
}

impl Default for PromptBuilder {
    #[inline]
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl PromptBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    #[inline]
    pub fn build(&self, sentence: &str, context: &str) -> Result<String, PromptError> {
        if sentence.trim().is_empty() {
            return Err(PromptError::EmptySentence);
        }

        Ok(format!(
            "<|system|>\n{}\n</s>\n<|user|>\nContext: {}\nSentence: {}\n</s>\n<|assistant|>\n",
            self.system_instruction, context, sentence
        ))
    }
}
