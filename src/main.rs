use anyhow::Result;
use clap::{Parser, Subcommand};
use grammar_tutor::commands::{
    build_index, correct_sentence, health_check, save_config, show_config, show_profile,
};
use grammar_tutor::config::{Config, get_config_dir};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "grammar-tutor")]
#[command(about = "A retrieval-grounded French grammar tutor")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the data files it references
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration
    Config {
        /// Write config.toml and install the bundled knowledge base
        #[arg(long)]
        save: bool,
    },
    /// Correct a French sentence
    Correct {
        /// Sentence to correct
        sentence: String,
        /// Learner whose profile is consulted and updated
        #[arg(long, default_value = "user_123")]
        user: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Precompute corpus embeddings into the embeddings cache
    BuildIndex,
    /// Show a learner's error history
    Profile {
        /// Learner id
        user: String,
    },
    /// Check that Ollama is reachable and serves the configured models
    Health,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };
    let config = Config::load(&config_dir)?;

    match cli.command {
        Commands::Config { save } => {
            if save {
                save_config(&config)?;
            }
            show_config(&config)?;
        }
        Commands::Correct {
            sentence,
            user,
            json,
        } => {
            correct_sentence(&config, &sentence, &user, json)?;
        }
        Commands::BuildIndex => {
            build_index(&config)?;
        }
        Commands::Profile { user } => {
            show_profile(&config, &user)?;
        }
        Commands::Health => {
            health_check(&config)?;
        }
    }

    Ok(())
}
