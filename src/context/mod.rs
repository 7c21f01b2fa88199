// Merges retrieved grammar rules with the learner's error history


use tracing::{debug, warn};

use crate::embeddings::Embedder;
use crate::index::VectorIndex;
use crate::profile::ProfileStore;

pub const GRAMMAR_CONTEXT_PREFIX: &str = "Retrieved Grammar Rule:";
pub const NO_RULE_FOUND: &str =
    "Retrieved Grammar Rule: No specific rule found, rely on model's general knowledge.";
pub const NO_USER_HISTORY: &str =
    "Retrieved User Profile: No specific weaknesses logged for this user.";

/// Context handed to the prompt, plus the topic the retrieved rule covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalContext {
    pub content: String,
    pub topic: Option<String>,
}

/// Read-only view over the index and the profile ledger
pub struct ContextAssembler<'a> {
    index: &'a VectorIndex,
    profiles: &'a ProfileStore,
    embedder: &'a dyn Embedder,
    top_k: usize,
}

impl<'a> ContextAssembler<'a> {
    #[inline]
    pub fn new(
        index: &'a VectorIndex,
        profiles: &'a ProfileStore,
        embedder: &'a dyn Embedder,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            profiles,
            embedder,
            top_k: top_k.max(1),
        }
    }

    /// Build the combined context for `sentence` as written by `user_id`.
    ///
    /// Retrieval and profile failures degrade to their sentinel segments;
    /// this never fails and never writes to the ledger.
    #[inline]
    pub fn get_context(&self, sentence: &str, user_id: &str) -> RetrievalContext {
        let (grammar, topic) = self.grammar_context(sentence);
        let user = self.user_context(user_id);

        RetrievalContext {
            content: format!("{grammar}\n{user}"),
            topic,
        }
    }

    fn grammar_context(&self, sentence: &str) -> (String, Option<String>) {
        let hits = match self.index.search(sentence, self.top_k, self.embedder) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Grammar rule retrieval failed, continuing without a rule: {}", e);
                return (NO_RULE_FOUND.to_string(), None);
            }
        };

        let Some(first) = hits.first() else {
            return (NO_RULE_FOUND.to_string(), None);
        };
        let topic = first.document.topic.clone();

        debug!(
            "Retrieved {} rule(s), nearest is document {} at distance {}",
            hits.len(),
            first.document.id,
            first.distance
        );

        let segment = hits
            .iter()
            .map(|hit| format!("{} {}", GRAMMAR_CONTEXT_PREFIX, hit.document.content))
            .collect::<Vec<_>>()
            .join("\n");

        (segment, topic)
    }

    fn user_context(&self, user_id: &str) -> String {
        match self.profiles.most_frequent_topic(user_id) {
            Ok(Some((topic, count))) => user_history_segment(&topic, count),
            Ok(None) => NO_USER_HISTORY.to_string(),
            Err(e) => {
                warn!("Could not read profile for user {}: {}", user_id, e);
                NO_USER_HISTORY.to_string()
            }
        }
    }
}

#[inline]
pub fn user_history_segment(topic: &str, count: u32) -> String {
    let times = if count == 1 { "time" } else { "times" };
    format!(
        "Retrieved User Profile: User frequently struggles with '{topic}' (logged {count} {times}). Provide targeted encouragement."
    )
}
