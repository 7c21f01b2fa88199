use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.embedding_model, "nomic-embed-text:latest");
    assert_eq!(config.retrieval.top_k, 1);
    assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
    assert_eq!(config.embedding.dimension, DEFAULT_EMBEDDING_DIMENSION);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.generation_model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.profiles.path = PathBuf::new();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::EmptyPath("profile store"))
    ));

    let mut invalid_config = config;
    invalid_config.embedding.dimension = 4;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("should load config successfully");
    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.retrieval, RetrievalConfig::default());
}

#[test]
fn partial_config_uses_section_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[retrieval]\ntop_k = 3\n\n[embedding]\nprovider = \"hashing\"\n",
    )
    .expect("should write config");

    let config = Config::load(temp_dir.path()).expect("should load config");
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.embedding.provider, EmbeddingProvider::Hashing);
    assert_eq!(config.embedding.dimension, DEFAULT_EMBEDDING_DIMENSION);
    assert_eq!(config.ollama, OllamaConfig::default());
}

#[test]
fn invalid_config_file_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("config.toml"), "[retrieval]\ntop_k = 0\n")
        .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::load(temp_dir.path()).expect("should load defaults");
    config.retrieval.top_k = 2;
    config.ollama.generation_model = "mistral:7b".to_string();
    config.save().expect("should save config");

    let reloaded = Config::load(temp_dir.path()).expect("should reload config");
    assert_eq!(config, reloaded);
}

#[test]
fn relative_paths_resolve_against_base_dir() {
    let config = Config {
        base_dir: PathBuf::from("/srv/tutor"),
        profiles: ProfilesConfig {
            path: PathBuf::from("/var/lib/profiles.json"),
        },
        ..Config::default()
    };

    assert_eq!(
        config.corpus_path(),
        PathBuf::from("/srv/tutor/grammar_knowledge_base.json")
    );
    assert_eq!(
        config.embeddings_cache_path(),
        Some(PathBuf::from("/srv/tutor/vector_store/embeddings.json"))
    );
    assert_eq!(
        config.profile_store_path(),
        PathBuf::from("/var/lib/profiles.json")
    );
}
