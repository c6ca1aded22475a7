
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use super::{ChatConfig, Config, ConfigError, EmbeddingBackend, EmbeddingConfig};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 PDF Chat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("Configure the Ollama instance used to embed document chunks.");
    eprintln!();

    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Chat Configuration").bold().yellow());
    eprintln!("Configure the OpenAI-compatible endpoint that answers questions.");
    eprintln!();

    configure_chat(&mut config.chat)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_retrieval(&mut config)?;

    if config.embedding.backend == EmbeddingBackend::Ollama {
        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());

        if test_ollama_connection(&config.embedding) {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Ollama").yellow()
            );
            eprintln!("You can continue, but make sure Ollama is running before ingesting.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Backend: {}", style(format!("{:?}", config.embedding.backend)).cyan());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!(
        "  Dimension: {}",
        style(config.embedding.embedding_dimension).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Chat Settings:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.chat.base_url).cyan());
    eprintln!("  Model: {}", style(&config.chat.model).cyan());
    let key_status = if config.chat.resolved_api_key().is_some() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!("  API Key: {}", key_status);

    eprintln!();
    eprintln!("{}", style("Pipeline Settings:").bold().yellow());
    eprintln!(
        "  Store: {} (table {})",
        style(format!("{:?}", config.store.backend)).cyan(),
        style(&config.store.table).cyan()
    );
    eprintln!(
        "  Chunk Size / Overlap: {} / {}",
        style(config.splitter.chunk_size).cyan(),
        style(config.splitter.chunk_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  History Limit: {}",
        style(
            config
                .history
                .max_turns
                .map_or_else(|| "unbounded".to_string(), |turns| format!("{} turns", turns))
        )
        .cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.join("config.toml").exists() {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
        return Ok(Config {
            base_dir: config_dir.to_path_buf(),
            ..Config::default()
        });
    }

    let config = Config::load(config_dir)?;
    eprintln!("{}", style("Found existing configuration.").green());
    Ok(config)
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let backends = &["ollama", "hashing (offline)"];
    let backend_index = Select::new()
        .with_prompt("Embedding backend")
        .default(usize::from(embedding.backend == EmbeddingBackend::Hashing))
        .items(backends)
        .interact()?;
    embedding.backend = if backend_index == 0 {
        EmbeddingBackend::Ollama
    } else {
        EmbeddingBackend::Hashing
    };

    if embedding.backend == EmbeddingBackend::Ollama {
        let protocols = &["http", "https"];
        let default_index = protocols
            .iter()
            .position(|&p| p == embedding.protocol)
            .unwrap_or(0);

        let protocol_index = Select::new()
            .with_prompt("Ollama protocol")
            .default(default_index)
            .items(protocols)
            .interact()?;

        let protocol = protocols[protocol_index].to_string();

        let host: String = Input::new()
            .with_prompt("Ollama host")
            .default(embedding.host.clone())
            .validate_with(|input: &String| -> Result<(), ConfigError> {
                let temp_config = EmbeddingConfig {
                    protocol: protocol.clone(),
                    host: input.clone(),
                    ..EmbeddingConfig::default()
                };
                temp_config.validate()
            })
            .interact_text()?;

        let port: u16 = Input::new()
            .with_prompt("Ollama port")
            .default(embedding.port)
            .validate_with(|input: &u16| -> Result<(), &str> {
                if *input == 0 {
                    Err("Port must be greater than 0")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        let model: String = Input::new()
            .with_prompt("Embedding model")
            .default(embedding.model.clone())
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.trim().is_empty() {
                    Err("Model name cannot be empty")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        let batch_size: u32 = Input::new()
            .with_prompt("Texts per embedding request")
            .default(embedding.batch_size)
            .validate_with(|input: &u32| -> Result<(), &str> {
                if (1..=1000).contains(input) {
                    Ok(())
                } else {
                    Err("Batch size must be between 1 and 1000")
                }
            })
            .interact_text()?;

        embedding.set_protocol(protocol)?;
        embedding.set_host(host)?;
        embedding.set_port(port)?;
        embedding.set_model(model)?;
        embedding.set_batch_size(batch_size)?;
    }

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(embedding.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    embedding.set_embedding_dimension(dimension)?;

    Ok(())
}

fn configure_chat(chat: &mut ChatConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Chat API base URL")
        .default(chat.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ChatConfig {
                base_url: input.clone(),
                ..ChatConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(chat.model.clone())
        .interact_text()?;

    let api_key = Password::new()
        .with_prompt("API key (leave empty to use OPENAI_API_KEY)")
        .allow_empty_password(true)
        .interact()?;

    chat.set_base_url(base_url)?;
    chat.set_model(model)?;
    if !api_key.trim().is_empty() {
        chat.api_key = Some(api_key);
    }

    Ok(())
}

fn configure_retrieval(config: &mut Config) -> Result<()> {
    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(config.splitter.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Chunk size must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(config.splitter.chunk_overlap.min(chunk_size - 1))
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input >= chunk_size {
                Err("Overlap must be smaller than the chunk size")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Top K must be between 1 and 100")
            }
        })
        .interact_text()?;

    config.splitter.chunk_size = chunk_size;
    config.splitter.chunk_overlap = chunk_overlap;
    config.retrieval.top_k = top_k;

    Ok(())
}

fn test_ollama_connection(embedding: &EmbeddingConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        embedding.protocol, embedding.host, embedding.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
