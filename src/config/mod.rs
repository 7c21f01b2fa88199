// Configuration management module
// Loads config.toml from the base directory and resolves data paths

pub mod settings;

pub use settings::{
    Config, ConfigError, CorpusConfig, EmbeddingConfig, EmbeddingProvider, OllamaConfig,
    ProfilesConfig, RetrievalConfig,
};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
