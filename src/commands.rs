use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use tracing::{error, info, warn};

use crate::config::{Config, EmbeddingProvider};
use crate::corpus::{self, EmbeddingsCache};
use crate::embeddings::OllamaClient;
use crate::profile::ProfileStore;
use crate::tutor::{Tutor, TutorConfig};

/// Documents sent to Ollama per embedding request
const EMBEDDING_BATCH_SIZE: usize = 32;

/// Write config.toml and install the bundled knowledge base if none exists yet
#[inline]
pub fn save_config(config: &Config) -> Result<()> {
    config.save()?;
    println!("Saved configuration to {}", config.config_file_path().display());

    let corpus_path = config.corpus_path();
    if corpus::install_bundled_corpus(&corpus_path)? {
        println!("Installed bundled knowledge base at {}", corpus_path.display());
    } else {
        println!("Using existing knowledge base at {}", corpus_path.display());
    }

    Ok(())
}

fn ensure_corpus(config: &Config) -> Result<()> {
    let corpus_path = config.corpus_path();
    if !corpus_path.exists() {
        anyhow::bail!(
            "No knowledge base at {}. Run `grammar-tutor config --save` to install the bundled one, or set [corpus] path in {}",
            corpus_path.display(),
            config.config_file_path().display()
        );
    }
    Ok(())
}

/// Print the effective configuration
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("📋 Current Configuration");
    println!();

    println!("Corpus:");
    println!("  Path: {}", config.corpus_path().display());
    match config.embeddings_cache_path() {
        Some(path) => println!("  Embeddings Cache: {}", path.display()),
        None => println!("  Embeddings Cache: disabled"),
    }
    println!("Profiles:");
    println!("  Path: {}", config.profile_store_path().display());
    println!("Retrieval:");
    println!("  Top K: {}", config.retrieval.top_k);
    println!("Embedding:");
    println!("  Provider: {:?}", config.embedding.provider);
    if config.embedding.provider == EmbeddingProvider::Hashing {
        println!("  Dimension: {}", config.embedding.dimension);
    }

    println!("Ollama Settings:");
    println!("  Host: {}", config.ollama.host);
    println!("  Port: {}", config.ollama.port);
    println!("  Embedding Model: {}", config.ollama.embedding_model);
    println!("  Generation Model: {}", config.ollama.generation_model);
    println!("  Timeout: {}s", config.ollama.timeout_secs);
    println!("  Retry Attempts: {}", config.ollama.retry_attempts);

    println!();
    match config.ollama.ollama_url() {
        Ok(url) => println!("  Ollama URL: {}", url),
        Err(e) => println!("  Ollama URL: Invalid ({})", e),
    }

    println!();
    println!("Config file: {}", config.config_file_path().display());

    Ok(())
}

/// Correct one sentence and print the result
#[inline]
pub fn correct_sentence(config: &Config, sentence: &str, user_id: &str, json: bool) -> Result<()> {
    ensure_corpus(config)?;
    let tutor_config = TutorConfig::from_settings(config)?;
    let tutor = Tutor::open(tutor_config).context("Failed to initialize tutor")?;

    let result = tutor
        .correct(sentence, user_id)
        .context("Failed to correct sentence")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        println!("📝 Original:    {}", sentence);
        println!("✅ Correction:  {}", result.correction);
        println!("💡 Explanation: {}", result.explanation);
    }

    Ok(())
}

/// Embed every corpus document and write the embeddings cache
#[inline]
pub fn build_index(config: &Config) -> Result<()> {
    let cache_path = config
        .embeddings_cache_path()
        .context("No embeddings cache path is configured")?;
    ensure_corpus(config)?;

    let tutor_config = TutorConfig::from_settings(config)?;
    let embedder = tutor_config.embedder;

    let documents = corpus::load_corpus(&config.corpus_path())?;
    if documents.is_empty() {
        warn!("Corpus is empty, nothing to embed");
        println!("Corpus {} has no documents.", config.corpus_path().display());
        return Ok(());
    }

    info!(
        "Embedding {} documents with model {}",
        documents.len(),
        embedder.model()
    );

    let bar = if std::io::stderr().is_terminal() {
        ProgressBar::new(documents.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                .context("Invalid progress template")?,
        )
    } else {
        ProgressBar::hidden()
    };

    let embeddings = match config.embedding.provider {
        EmbeddingProvider::Ollama => {
            let client =
                OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
            let mut embeddings = Vec::with_capacity(documents.len());
            for batch in documents.chunks(EMBEDDING_BATCH_SIZE) {
                bar.set_message(format!("batch of {}", batch.len()));
                let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
                embeddings.extend(
                    client
                        .generate_embeddings(&texts)
                        .context("Failed to embed corpus batch")?,
                );
                bar.inc(batch.len() as u64);
            }
            embeddings
        }
        EmbeddingProvider::Hashing => {
            let mut embeddings = Vec::with_capacity(documents.len());
            for document in &documents {
                bar.set_message(format!("document {}", document.id));
                let embedding = embedder
                    .embed(&document.content)
                    .with_context(|| format!("Failed to embed document {}", document.id))?;
                embeddings.push(embedding);
                bar.inc(1);
            }
            embeddings
        }
    };
    bar.finish_and_clear();

    let dimension = embeddings.first().map_or(0, Vec::len);
    if let Some(position) = embeddings.iter().position(|e| e.len() != dimension) {
        anyhow::bail!(
            "Embedding for document at position {} has {} dimensions, expected {}",
            position,
            embeddings[position].len(),
            dimension
        );
    }

    let cache = EmbeddingsCache {
        model: embedder.model().to_string(),
        dimension,
        embeddings,
    };
    corpus::save_embeddings_cache(&cache_path, &cache)?;

    println!(
        "✅ Embedded {} documents ({} dimensions) into {}",
        cache.embeddings.len(),
        cache.dimension,
        cache_path.display()
    );
    Ok(())
}

/// Print a learner's error history
#[inline]
pub fn show_profile(config: &Config, user_id: &str) -> Result<()> {
    let store = ProfileStore::open(config.profile_store_path())?;

    let Some(profile) = store.profile(user_id)? else {
        println!("No errors logged for user {}.", user_id);
        return Ok(());
    };

    println!("👤 {} ({} errors logged)", user_id, profile.total_errors());
    for (topic, count) in &profile.error_counts {
        println!("   {}: {}", topic, count);
    }

    if let Some((topic, count)) = profile.most_frequent_topic() {
        println!("   Most frequent: {} ({})", topic, count);
    }

    if let Some(last_seen) = profile.last_seen {
        println!("   Last seen: {}", last_seen.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

/// Verify Ollama is reachable and serves both configured models
#[inline]
pub fn health_check(config: &Config) -> Result<()> {
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;

    match client.health_check() {
        Ok(()) => {
            println!(
                "✅ Ollama connected at {}:{} with models {} and {}",
                config.ollama.host,
                config.ollama.port,
                config.ollama.embedding_model,
                config.ollama.generation_model
            );
            Ok(())
        }
        Err(e) => {
            error!("Ollama health check failed: {}", e);
            println!(
                "Error: Ollama at {}:{} is not ready",
                config.ollama.host, config.ollama.port
            );
            println!("Please ensure Ollama is running and both models are pulled.");
            Err(e)
        }
    }
}
