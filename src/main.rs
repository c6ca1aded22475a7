use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_chat::commands::{ask_question, ingest_paths, run_chat, show_status};
use pdf_chat::config::{Config, get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "pdf-chat")]
#[command(about = "Chat with your PDF and text documents using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Use this configuration directory instead of the default
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure embedding, chat and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Split, embed and store documents (files or directories)
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a single question about the ingested documents
    Ask {
        question: String,
    },
    /// Start an interactive conversation
    Chat,
    /// Show status of the embedding model, chat endpoint and vector store
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ingest { paths } => {
            ingest_paths(&load_config(&config_dir)?, paths).await?;
        }
        Commands::Ask { question } => {
            ask_question(&load_config(&config_dir)?, &question).await?;
        }
        Commands::Chat => {
            run_chat(&load_config(&config_dir)?).await?;
        }
        Commands::Status => {
            show_status(&load_config(&config_dir)?).await?;
        }
    }

    Ok(())
}

fn load_config(config_dir: &std::path::Path) -> Result<Config> {
    Config::load(config_dir)
        .with_context(|| format!("Failed to load configuration from {}", config_dir.display()))
}
