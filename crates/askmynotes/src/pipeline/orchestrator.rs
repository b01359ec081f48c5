//! Sequences extraction, chunking, embedding, indexing and answering
//!
//! This is the single place pipeline errors are caught: each stage returns a
//! `Result`, and the orchestrator records the failing stage before handing the
//! error back to its caller.

use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::ingestion::{TextExtractor, TextSplitter};
use crate::providers::{AnswerGenerator, EmbeddingProvider};
use crate::retrieval::{FlatIndexBuilder, IndexBuilder, VectorIndex};
use crate::types::{Answer, AskRequest, Chunk, Document, IngestSummary, Upload};

use super::state::{PipelineState, Stage, StatusHandle};

/// Owns one document's index and answers questions against it
///
/// Methods take `&mut self`; callers sharing an orchestrator serialize access
/// (the server keeps one behind a per-session mutex).
pub struct Orchestrator {
    splitter: TextSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    index_builder: Arc<dyn IndexBuilder>,
    top_k: usize,
    index: Option<Box<dyn VectorIndex>>,
    status: StatusHandle,
}

impl Orchestrator {
    /// Create an orchestrator with explicit components
    pub fn new(
        splitter: TextSplitter,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
        index_builder: Arc<dyn IndexBuilder>,
        top_k: usize,
    ) -> Self {
        Self {
            splitter,
            embedder,
            generator,
            index_builder,
            top_k: top_k.max(1),
            index: None,
            status: StatusHandle::new(),
        }
    }

    /// Create an orchestrator from configuration and shared providers
    pub fn from_config(
        config: &AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        Ok(Self::new(
            TextSplitter::from_config(&config.chunking)?,
            embedder,
            generator,
            Arc::new(FlatIndexBuilder::new(config.retrieval.metric)),
            config.retrieval.top_k,
        ))
    }

    /// Read view of this orchestrator's progress
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        self.status.state()
    }

    /// True once a document is indexed
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Process an uploaded file up to `Indexed`
    ///
    /// The previous document and index are discarded first, whatever the
    /// outcome. On failure the state becomes `Failed` and no index exists.
    pub async fn upload(&mut self, upload: Upload) -> Result<IngestSummary> {
        self.index = None;
        self.status.reset();

        let start = Instant::now();
        let mut stage = Stage::Reading;

        match self.ingest(upload, &mut stage, start).await {
            Ok((index, summary)) => {
                tracing::info!(
                    "Indexed '{}': {} chunks, {} dimensions in {}ms",
                    summary.filename,
                    summary.chunks,
                    summary.dimensions,
                    summary.processing_time_ms
                );
                self.index = Some(index);
                self.status.indexed(summary.clone());
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!("{} stage failed: {}", stage, e);
                self.status.set_state(PipelineState::failed(stage, &e));
                Err(e)
            }
        }
    }

    async fn ingest(
        &self,
        upload: Upload,
        stage: &mut Stage,
        start: Instant,
    ) -> Result<(Box<dyn VectorIndex>, IngestSummary)> {
        *stage = Stage::Reading;
        self.status.set_state(PipelineState::Reading);
        tracing::info!("Reading file: {} ({} bytes)", upload.filename, upload.data.len());
        let document = Document::from_upload(upload)?;
        let filename = document.filename.clone();
        let format = document.format;
        let file_size = document.size();

        *stage = Stage::Extracting;
        self.status.set_state(PipelineState::Extracting);
        let extracted = tokio::task::spawn_blocking(move || TextExtractor::extract(&document))
            .await
            .map_err(|e| Error::internal(format!("Extraction task failed: {}", e)))??;
        if extracted.is_blank() {
            return Err(Error::EmptyContent(filename));
        }
        let characters = extracted.text.chars().count();
        tracing::info!("Extracted {} characters from '{}'", characters, filename);

        *stage = Stage::Chunking;
        self.status.set_state(PipelineState::Chunking);
        let chunks: Vec<Chunk> = self.splitter.split(&extracted.text).collect();
        tracing::info!(
            "Split '{}' into {} chunks (size {}, overlap {})",
            filename,
            chunks.len(),
            self.splitter.chunk_size(),
            self.splitter.overlap()
        );

        *stage = Stage::Embedding;
        self.status.set_state(PipelineState::Embedding);
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_many(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }
        let chunk_count = chunks.len();
        let index = self.index_builder.build(chunks, embeddings)?;
        if index.dimensions() != self.embedder.dimensions() {
            return Err(Error::embedding(format!(
                "{} returned {}-dimensional vectors, expected {}",
                self.embedder.name(),
                index.dimensions(),
                self.embedder.dimensions()
            )));
        }

        let summary = IngestSummary {
            filename,
            format,
            file_size,
            pages: extracted.pages,
            characters,
            chunks: chunk_count,
            dimensions: index.dimensions(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        Ok((index, summary))
    }

    /// Answer one question against the indexed document
    ///
    /// Each question is independent; nothing from earlier questions reaches
    /// the prompt. A failure leaves the index in place and the state back at
    /// `Indexed`.
    pub async fn ask(&mut self, request: &AskRequest) -> Result<Answer> {
        let Some(index) = self.index.as_deref() else {
            return Err(Error::NoDocument);
        };

        let start = Instant::now();
        self.status.set_state(PipelineState::Querying);
        tracing::info!("Question: {}", request.question);

        let top_k = request.top_k.unwrap_or(self.top_k);
        let result = answer(
            index,
            self.embedder.as_ref(),
            self.generator.as_ref(),
            &request.question,
            top_k,
        )
        .await;

        match result {
            Ok((answer, context)) => {
                self.status.answered();
                let processing_time_ms = start.elapsed().as_millis() as u64;
                tracing::info!(
                    "Answered from {} chunks in {}ms",
                    context.len(),
                    processing_time_ms
                );
                Ok(Answer {
                    question: request.question.clone(),
                    answer,
                    context,
                    processing_time_ms,
                })
            }
            Err(e) => {
                tracing::warn!("Question failed: {}", e);
                self.status.set_state(PipelineState::Indexed);
                Err(e)
            }
        }
    }
}

async fn answer(
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    generator: &dyn AnswerGenerator,
    question: &str,
    top_k: usize,
) -> Result<(String, Vec<crate::retrieval::SearchHit>)> {
    if question.trim().is_empty() {
        return Err(Error::InvalidRequest("Question is empty".to_string()));
    }
    if top_k == 0 {
        return Err(Error::InvalidRequest("top_k must be at least 1".to_string()));
    }

    let query = embedder.embed(question).await?;
    let hits = index.query(&query, top_k)?;
    let context = PromptBuilder::build_context(&hits);

    tracing::debug!("Generating with {} ({})", generator.name(), generator.model());
    let text = generator.generate(&context, question).await?;
    Ok((text, hits))
}
