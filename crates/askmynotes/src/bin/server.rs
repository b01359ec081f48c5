//! AskMyNotes server binary
//!
//! Run with: cargo run -p askmynotes --bin askmynotes-server

use askmynotes::{
    config::{AppConfig, Credentials},
    server::AskMyNotesServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askmynotes=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Both fail before anything binds
    let config = AppConfig::load()?;
    let credentials = Credentials::from_env()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.gemini.embedding_model);
    tracing::info!("  - Generation model: {}", config.gemini.generation_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!(
        "  - Retrieval: top {} by {:?}",
        config.retrieval.top_k,
        config.retrieval.metric
    );

    let server = AskMyNotesServer::new(config, &credentials)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/sessions              - Open a session");
    println!("  POST /api/sessions/:id/document - Upload a note file");
    println!("  POST /api/sessions/:id/ask      - Ask a question");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
