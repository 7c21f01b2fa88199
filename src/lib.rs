use thiserror::Error;

pub type Result<T> = std::result::Result<T, TutorError>;

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("Tutor is not initialized")]
    NotReady,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(#[from] corpus::CorpusError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Profile store error: {0}")]
    Profile(#[from] profile::ProfileError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] prompt::PromptError),

    #[error("Generation error: {0}")]
    Generation(#[source] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod context;
pub mod corpus;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod profile;
pub mod prompt;
pub mod tutor;
