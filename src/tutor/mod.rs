//! Tutor orchestration
//!
//! Drives one correction end to end: retrieval, prompt rendering,
//! generation, and the conditional profile update.


use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, EmbeddingProvider, settings::DEFAULT_TOP_K};
use crate::context::{ContextAssembler, RetrievalContext};
use crate::corpus::{self, Document};
use crate::embeddings::{Embedder, HashingEmbedder, OllamaClient};
use crate::generation::Generator;
use crate::index::{IndexError, VectorIndex};
use crate::profile::ProfileStore;
use crate::prompt::{PromptBuilder, PromptError};
use crate::{Result, TutorError};

const DIMENSION_CHECK_TEXT: &str = "bonjour";

/// Everything a [`Tutor`] needs to reach the ready state
#[derive(Clone)]
pub struct TutorConfig {
    pub corpus_path: PathBuf,
    pub embeddings_cache_path: Option<PathBuf>,
    pub profile_store_path: PathBuf,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub top_k: usize,
}

impl TutorConfig {
    #[inline]
    pub fn new(
        corpus_path: impl Into<PathBuf>,
        profile_store_path: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            embeddings_cache_path: None,
            profile_store_path: profile_store_path.into(),
            embedder,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn with_embeddings_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.embeddings_cache_path = Some(path.into());
        self
    }

    /// Resolve paths and wire up the Ollama-backed capabilities from settings
    #[inline]
    pub fn from_settings(config: &Config) -> anyhow::Result<Self> {
        config
            .validate()
            .context("Configuration validation failed")?;

        let client = Arc::new(
            OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?,
        );

        let embedder: Arc<dyn Embedder> = match config.embedding.provider {
            EmbeddingProvider::Ollama => Arc::clone(&client) as Arc<dyn Embedder>,
            EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::new(config.embedding.dimension)),
        };

        Ok(Self {
            corpus_path: config.corpus_path(),
            embeddings_cache_path: config.embeddings_cache_path(),
            profile_store_path: config.profile_store_path(),
            embedder,
            generator: client,
            top_k: config.retrieval.top_k,
        })
    }
}

/// What the caller gets back from [`Tutor::correct`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionResult {
    pub correction: String,
    pub explanation: String,
}

struct ReadyState {
    index: VectorIndex,
    profiles: ProfileStore,
}

enum TutorState {
    Uninitialized,
    Ready(ReadyState),
}

/// Public entry point.
///
/// Starts uninitialized; [`Tutor::initialize`] loads the corpus, builds the
/// index and opens the profile store. There is no way back once ready.
pub struct Tutor {
    config: TutorConfig,
    prompt: PromptBuilder,
    state: TutorState,
}

impl Tutor {
    #[inline]
    pub fn new(config: TutorConfig) -> Self {
        Self {
            config,
            prompt: PromptBuilder::default(),
            state: TutorState::Uninitialized,
        }
    }

    /// Construct and initialize in one step
    #[inline]
    pub fn open(config: TutorConfig) -> Result<Self> {
        let mut tutor = Self::new(config);
        tutor.initialize()?;
        Ok(tutor)
    }

    #[inline]
    pub fn with_prompt_builder(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, TutorState::Ready(_))
    }

    /// Transition to the ready state; a no-op when already ready
    #[inline]
    pub fn initialize(&mut self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        if self.config.top_k == 0 {
            return Err(TutorError::Config("top_k must be at least 1".to_string()));
        }

        info!("Initializing tutor from corpus {}", self.config.corpus_path.display());

        let mut documents = corpus::load_corpus(&self.config.corpus_path)?;
        self.apply_cached_embeddings(&mut documents);

        let mut index = VectorIndex::new();
        match index.build(documents, self.config.embedder.as_ref()) {
            Ok(()) => {}
            Err(IndexError::EmptyCorpus) => {
                warn!(
                    "Corpus {} is empty, corrections will run without grammar rules",
                    self.config.corpus_path.display()
                );
            }
            Err(e) => return Err(e.into()),
        }

        let profiles = ProfileStore::open(&self.config.profile_store_path)?;

        self.state = TutorState::Ready(ReadyState { index, profiles });
        info!("Tutor is ready");
        Ok(())
    }

    fn apply_cached_embeddings(&self, documents: &mut [Document]) {
        let Some(cache_path) = &self.config.embeddings_cache_path else {
            return;
        };

        let cache = match corpus::load_embeddings_cache(cache_path) {
            Ok(Some(cache)) => cache,
            Ok(None) => return,
            Err(e) => {
                warn!("Ignoring unreadable embeddings cache: {}", e);
                return;
            }
        };

        let embedder = self.config.embedder.as_ref();
        if cache.model != embedder.model() {
            warn!(
                "Embeddings cache was built with model {} but embedder is {}, ignoring cache",
                cache.model,
                embedder.model()
            );
            return;
        }

        // Rows that cannot be compared with query vectors would make every search fail
        match embedder.embed(DIMENSION_CHECK_TEXT) {
            Ok(vector) if vector.len() == cache.dimension => {
                corpus::apply_embeddings_cache(documents, &cache);
            }
            Ok(vector) => warn!(
                "Embeddings cache has {} dimensions but embedder produces {}, ignoring cache",
                cache.dimension,
                vector.len()
            ),
            Err(e) => warn!("Could not check embeddings cache dimension, ignoring cache: {}", e),
        }
    }

    fn ready(&self) -> Result<&ReadyState> {
        match &self.state {
            TutorState::Ready(ready) => Ok(ready),
            TutorState::Uninitialized => Err(TutorError::NotReady),
        }
    }

    #[inline]
    pub fn index(&self) -> Result<&VectorIndex> {
        Ok(&self.ready()?.index)
    }

    #[inline]
    pub fn profile_store(&self) -> Result<&ProfileStore> {
        Ok(&self.ready()?.profiles)
    }

    /// Retrieval context for a sentence, without generating anything
    #[inline]
    pub fn context(&self, sentence: &str, user_id: &str) -> Result<RetrievalContext> {
        let ready = self.ready()?;
        Ok(self.assembler(ready).get_context(sentence, user_id))
    }

    fn assembler<'a>(&'a self, ready: &'a ReadyState) -> ContextAssembler<'a> {
        ContextAssembler::new(
            &ready.index,
            &ready.profiles,
            self.config.embedder.as_ref(),
            self.config.top_k,
        )
    }

    /// Correct `sentence` for `user_id`.
    ///
    /// Generation failures are returned as errors. A failed profile update is
    /// logged and does not affect the returned correction.
    #[inline]
    pub fn correct(&self, sentence: &str, user_id: &str) -> Result<CorrectionResult> {
        let ready = self.ready()?;

        if sentence.trim().is_empty() {
            return Err(PromptError::EmptySentence.into());
        }

        let context = self.assembler(ready).get_context(sentence, user_id);
        let prompt = self.prompt.build(sentence, &context.content)?;

        debug!("Querying generator for user {}", user_id);
        let generation = self
            .config
            .generator
            .generate(&prompt)
            .map_err(TutorError::Generation)?;

        if generation.found_error() {
            let topic = context.topic.as_deref().or(generation.topic.as_deref());
            match topic {
                Some(topic) => match ready.profiles.increment_topic(user_id, topic) {
                    Ok(count) => debug!("User {} has {} '{}' errors", user_id, count, topic),
                    Err(e) => warn!("Failed to update profile for user {}: {}", user_id, e),
                },
                None => debug!("No topic identified, profile left unchanged"),
            }
        }

        Ok(CorrectionResult {
            correction: generation.correction,
            explanation: generation.explanation,
        })
    }
}
