//! AskMyNotes terminal front-end
//!
//! Run with: cargo run -p askmynotes --features cli --bin askmynotes -- notes.pdf

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use askmynotes::{
    config::{AppConfig, Credentials},
    pipeline::Orchestrator,
    providers::{GeminiClient, GeminiEmbedder},
    types::{AskRequest, Upload},
};

#[derive(Parser)]
#[command(name = "askmynotes")]
#[command(about = "Ask questions about a PDF, DOCX or text file")]
#[command(version)]
struct Cli {
    /// Note file to load
    file: PathBuf,

    /// Question to ask (repeatable); reads questions from stdin when omitted
    #[arg(short, long = "question")]
    questions: Vec<String>,

    /// Number of chunks to retrieve per question
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Print the retrieved context under each answer
    #[arg(long)]
    show_context: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "askmynotes=debug" } else { "askmynotes=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load()?;
    let credentials = Credentials::from_env()?;

    let embedder = Arc::new(GeminiEmbedder::new(&config.gemini, &credentials)?);
    let generator = Arc::new(GeminiClient::new(&config.gemini, &credentials)?);
    let mut orchestrator = Orchestrator::from_config(&config, embedder, generator)?;

    let data = tokio::fs::read(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let filename = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| cli.file.display().to_string());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    // Mirror pipeline progress into the spinner while the upload runs
    let status = orchestrator.status();
    let ticker = {
        let spinner = spinner.clone();
        tokio::spawn(async move {
            loop {
                spinner.set_message(status.state().label());
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
    };

    let result = orchestrator.upload(Upload::new(filename, None, data)).await;
    ticker.abort();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            spinner.abandon_with_message(orchestrator.state().label());
            return Err(e.into());
        }
    };
    spinner.finish_with_message(format!(
        "{} ({} chunks from {} characters)",
        orchestrator.state().label(),
        summary.chunks,
        summary.characters
    ));

    if cli.questions.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        eprintln!("Ask a question (Ctrl+D to quit):");
        while let Some(line) = lines.next_line().await? {
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            ask(&mut orchestrator, question, &cli).await;
        }
    } else {
        for question in &cli.questions {
            ask(&mut orchestrator, question, &cli).await;
        }
    }

    Ok(())
}

/// Answer one question; failures are printed and leave the index usable
async fn ask(orchestrator: &mut Orchestrator, question: &str, cli: &Cli) {
    let mut request = AskRequest::new(question);
    request.top_k = cli.top_k;

    match orchestrator.ask(&request).await {
        Ok(answer) => {
            println!("\n{}\n", answer.answer.trim());
            if cli.show_context {
                for (rank, hit) in answer.context.iter().enumerate() {
                    println!(
                        "--- [{}] chunk {} (distance {:.4})\n{}",
                        rank + 1,
                        hit.chunk.index,
                        hit.distance,
                        hit.chunk.content
                    );
                }
                println!();
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
