use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::chain::{ChainAnswer, ConversationalChain};
use crate::config::{Config, EmbeddingBackend};
use crate::embeddings::OllamaClient;
use crate::loader::{FILE_NAME_KEY, load_paths};
use crate::pipeline::Pipeline;
use crate::store::VectorStore;

fn spinner(message: &str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Load the given files and directories and ingest them into the vector store
#[inline]
pub async fn ingest_paths(config: &Config, paths: Vec<PathBuf>) -> Result<()> {
    let pipeline = Pipeline::from_config(config)
        .await
        .context("Failed to initialize pipeline")?;
    let ingestor = pipeline.ingestor()?;

    let bar = spinner("Reading documents");
    let loaded = tokio::task::spawn_blocking(move || load_paths(&paths))
        .await
        .context("Document loading task failed")??;

    for (path, error) in &loaded.failures {
        bar.suspend(|| {
            eprintln!(
                "{} {}: {}",
                style("⚠ Skipped").yellow(),
                path.display(),
                error
            );
        });
    }

    if loaded.documents.is_empty() {
        bar.finish_and_clear();
        println!("No documents to ingest.");
        return Ok(());
    }

    bar.set_message(format!("Ingesting {} documents", loaded.documents.len()));
    let report = ingestor.ingest(&loaded.documents).await;
    bar.finish_and_clear();

    println!(
        "{} Ingested {}/{} documents: {} chunks stored, {} duplicates skipped",
        style("✓").green(),
        report.succeeded(),
        report.documents,
        report.stored,
        report.skipped_duplicates
    );
    for failure in &report.failures {
        error!("Failed to ingest {}: {}", failure.source, failure.error);
        println!(
            "  {} {}: {}",
            style("✗").red(),
            failure.source,
            failure.error
        );
    }

    let total = pipeline.store().count().await?;
    println!("Vector store now holds {} chunks.", total);

    Ok(())
}

/// Answer a single question
#[inline]
pub async fn ask_question(config: &Config, question: &str) -> Result<()> {
    let pipeline = Pipeline::from_config(config)
        .await
        .context("Failed to initialize pipeline")?;
    let mut session = pipeline.session()?;

    let bar = spinner("Thinking");
    let answer = session.ask_with_sources(question).await;
    bar.finish_and_clear();

    print_answer(&answer?);
    Ok(())
}

/// Interactive conversation on stdin. `/reset` clears history, `/exit` quits.
#[inline]
pub async fn run_chat(config: &Config) -> Result<()> {
    let pipeline = Pipeline::from_config(config)
        .await
        .context("Failed to initialize pipeline")?;
    let mut session = pipeline.session()?;

    println!(
        "{}",
        style("Ask questions about your documents. /reset clears history, /exit quits.").dim()
    );

    loop {
        let line: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        let line = line.trim();

        match line {
            "" => {}
            "/exit" | "/quit" => break,
            "/reset" => {
                session.reset();
                println!("{}", style("History cleared.").dim());
            }
            question => chat_turn(&mut session, question).await,
        }
    }

    info!("Chat ended after {} turns", session.history().len());
    Ok(())
}

async fn chat_turn(session: &mut ConversationalChain, question: &str) {
    let bar = spinner("Thinking");
    let answer = session.ask_with_sources(question).await;
    bar.finish_and_clear();

    match answer {
        Ok(answer) => print_answer(&answer),
        Err(e) => println!("{} {}", style("Error:").red().bold(), e),
    }
}

fn print_answer(answer: &ChainAnswer) {
    println!("{}", answer.answer);

    if !answer.sources.is_empty() {
        println!();
        println!("{}", style("Sources:").dim());
        for source in &answer.sources {
            let name = source
                .metadata
                .get(FILE_NAME_KEY)
                .map_or("unknown", String::as_str);
            println!(
                "  {} {}",
                style(format!("{:.3}", source.score)).cyan(),
                style(name).dim()
            );
        }
    }
}

/// Show detailed status of the configured components
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("📊 PDF Chat Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    println!("   📄 File: {}", config.config_file_path().display());
    println!(
        "   ✂️  Chunks: {} chars, {} overlap",
        config.splitter.chunk_size, config.splitter.chunk_overlap
    );
    println!("   🔢 Top K: {}", config.retrieval.top_k);

    println!("🤖 Embedding Status:");
    match config.embedding.backend {
        EmbeddingBackend::Hashing => {
            println!(
                "   ✅ Hashing embedder ({} dimensions, offline)",
                config.embedding.embedding_dimension
            );
        }
        EmbeddingBackend::Ollama => match OllamaClient::new(&config.embedding) {
            Ok(client) => {
                let health = tokio::task::spawn_blocking(move || client.health_check())
                    .await
                    .context("Health check task failed")?;
                match health {
                    Ok(()) => {
                        println!(
                            "   ✅ Ollama: Connected ({}:{})",
                            config.embedding.host, config.embedding.port
                        );
                        println!("   📋 Model: {}", config.embedding.model);
                    }
                    Err(e) => println!("   ⚠️  Ollama: Unhealthy - {:#}", e),
                }
            }
            Err(e) => println!("   ❌ Ollama: Invalid configuration - {:#}", e),
        },
    }

    println!("💬 Chat Status:");
    println!(
        "   📋 Model: {} at {}",
        config.chat.model, config.chat.base_url
    );
    if config.chat.resolved_api_key().is_some() {
        println!("   ✅ API key: present");
    } else {
        println!(
            "   ❌ API key: missing (set chat.api_key or {})",
            crate::config::API_KEY_ENV
        );
    }

    println!("🔍 Vector Store Status:");
    match Pipeline::from_config(config).await {
        Ok(pipeline) => report_store(&pipeline.store()).await,
        Err(e) => println!("   ❌ Failed to open - {}", e),
    }

    Ok(())
}

async fn report_store(store: &Arc<dyn VectorStore>) {
    match store.count().await {
        Ok(count) => println!(
            "   ✅ {} chunks stored ({} dimensions)",
            count,
            store.dimension()
        ),
        Err(e) => println!("   ⚠️  Store opened but unreadable - {}", e),
    }
}
