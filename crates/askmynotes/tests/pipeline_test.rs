//! Integration tests for the upload-then-ask pipeline.
//!
//! Tests the complete flow: read → extract → chunk → embed → index → ask,
//! with in-memory providers standing in for the Gemini API.

use async_trait::async_trait;
use askmynotes::{
    config::{AppConfig, ChunkingConfig, Credentials, DistanceMetric},
    ingestion::{TextExtractor, TextSplitter},
    pipeline::{Orchestrator, PipelineState, Stage, NO_TEXT_FOUND},
    providers::{AnswerGenerator, EmbeddingProvider},
    retrieval::FlatIndexBuilder,
    types::{AskRequest, Document, Upload},
    Error, Result,
};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const TEST_DIM: usize = 64;

/// Deterministic hashed bag-of-words embedder, unit length
#[derive(Default)]
struct BagOfWordsEmbedder {
    batches: Mutex<Vec<Vec<String>>>,
}

impl BagOfWordsEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; TEST_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % TEST_DIM as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    fn embedded_texts(&self) -> Vec<String> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batches.lock().push(texts.to_vec());
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }

    fn name(&self) -> &str {
        "bag-of-words"
    }
}

/// Embedder whose document calls always fail
struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("quota exceeded"))
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Records every (context, question) pair; fails the first `fail_first` calls
#[derive(Default)]
struct RecordingGenerator {
    calls: Mutex<Vec<(String, String)>>,
    fail_first: usize,
    attempts: AtomicUsize,
}

impl RecordingGenerator {
    fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) < self.fail_first {
            return Err(Error::answer_generation("model overloaded"));
        }
        self.calls.lock().push((context.to_string(), question.to_string()));
        Ok(format!("Answer to '{}'", question))
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording-1"
    }
}

fn orchestrator(
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
) -> Orchestrator {
    Orchestrator::from_config(&AppConfig::default(), embedder, generator).unwrap()
}

fn text_upload(name: &str, content: &str) -> Upload {
    Upload::new(name, Some("text/plain".to_string()), content.as_bytes().to_vec())
}

fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let mut docx = docx_rs::Docx::new();
    for text in paragraphs {
        docx = docx.add_paragraph(docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)));
    }
    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).unwrap();
    buf.into_inner()
}

#[tokio::test]
async fn test_short_text_is_one_chunk() {
    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let mut orch = orchestrator(embedder.clone(), Arc::new(RecordingGenerator::default()));

    let text = "The sky is blue. Grass is green.";
    let summary = orch.upload(text_upload("notes.txt", text)).await.unwrap();

    assert_eq!(summary.chunks, 1);
    assert_eq!(summary.characters, text.len());
    assert_eq!(embedder.embedded_texts(), vec![text.to_string()]);
    assert_eq!(orch.state(), PipelineState::Indexed);
}

#[tokio::test]
async fn test_whitespace_only_file_is_empty_content() {
    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let mut orch = orchestrator(embedder.clone(), Arc::new(RecordingGenerator::default()));

    let err = orch
        .upload(text_upload("blank.txt", "  \n\t \n"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EmptyContent(_)));
    assert!(embedder.embedded_texts().is_empty());
    assert!(!orch.has_index());
    assert_eq!(orch.state().label(), NO_TEXT_FOUND);

    let err = orch.ask(&AskRequest::new("Anything?")).await.unwrap_err();
    assert!(matches!(err, Error::NoDocument));
}

#[tokio::test]
async fn test_unsupported_type_fails_before_chunking() {
    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let mut orch = orchestrator(embedder.clone(), Arc::new(RecordingGenerator::default()));

    let upload = Upload::new("photo.png", Some("image/png".to_string()), vec![0x89, b'P', b'N', b'G']);
    let err = orch.upload(upload).await.unwrap_err();

    assert!(matches!(err, Error::UnsupportedFormat(_)));
    assert!(embedder.embedded_texts().is_empty());
    assert!(matches!(
        orch.state(),
        PipelineState::Failed { stage: Stage::Reading, .. }
    ));
}

#[tokio::test]
async fn test_question_retrieves_matching_chunk() {
    let generator = Arc::new(RecordingGenerator::default());
    let mut orch = orchestrator(Arc::new(BagOfWordsEmbedder::default()), generator.clone());

    orch.upload(text_upload("france.txt", "Paris is the capital of France."))
        .await
        .unwrap();
    let answer = orch
        .ask(&AskRequest::new("What is the capital of France?"))
        .await
        .unwrap();

    assert_eq!(answer.context[0].chunk.content, "Paris is the capital of France.");
    let calls = generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Paris is the capital of France.");
    assert_eq!(calls[0].1, "What is the capital of France?");
}

#[test]
fn test_missing_credential_fails_fast() {
    let err = Credentials::from_lookup(|_| None).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn test_retrieval_ranks_relevant_chunks_first() {
    let generator = Arc::new(RecordingGenerator::default());
    let mut orch = Orchestrator::new(
        TextSplitter::new(60, 10).unwrap(),
        Arc::new(BagOfWordsEmbedder::default()),
        generator.clone(),
        Arc::new(FlatIndexBuilder::new(DistanceMetric::L2)),
        2,
    );

    let text = "Photosynthesis turns sunlight into sugar.\n\n\
                Mitochondria are the powerhouse of the cell.\n\n\
                Volcanoes erupt molten rock called lava.\n\n\
                Glaciers carve valleys over thousands of years.";
    let summary = orch.upload(text_upload("science.txt", text)).await.unwrap();
    assert_eq!(summary.chunks, 4);

    let answer = orch
        .ask(&AskRequest::new("What do volcanoes erupt?"))
        .await
        .unwrap();

    assert_eq!(answer.context.len(), 2);
    assert!(answer.context[0].chunk.content.contains("Volcanoes"));
    assert!(answer.context[0].distance <= answer.context[1].distance);

    let (context, _) = &generator.calls()[0];
    assert!(context.starts_with(answer.context[0].chunk.content.as_str()));
    assert!(context.contains("\n\n"));
}

#[tokio::test]
async fn test_top_k_override_and_small_index() {
    let mut orch = orchestrator(
        Arc::new(BagOfWordsEmbedder::default()),
        Arc::new(RecordingGenerator::default()),
    );
    orch.upload(text_upload("one.txt", "Only one chunk here."))
        .await
        .unwrap();

    let answer = orch
        .ask(&AskRequest::new("What is here?").with_top_k(10))
        .await
        .unwrap();
    assert_eq!(answer.context.len(), 1);
}

#[tokio::test]
async fn test_embedding_failure_leaves_no_index() {
    let mut orch = orchestrator(Arc::new(FailingEmbedder), Arc::new(RecordingGenerator::default()));

    let err = orch
        .upload(text_upload("notes.txt", "Some notes."))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Embedding(_)));
    assert!(!orch.has_index());
    match orch.state() {
        PipelineState::Failed { stage, reason, .. } => {
            assert_eq!(stage, Stage::Embedding);
            assert!(reason.contains("quota exceeded"));
        }
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_answer_failure_keeps_index() {
    let generator = Arc::new(RecordingGenerator::failing_first(1));
    let mut orch = orchestrator(Arc::new(BagOfWordsEmbedder::default()), generator.clone());
    orch.upload(text_upload("france.txt", "Paris is the capital of France."))
        .await
        .unwrap();

    let question = AskRequest::new("What is the capital of France?");
    let err = orch.ask(&question).await.unwrap_err();
    assert!(matches!(err, Error::AnswerGeneration(_)));
    assert!(orch.has_index());
    assert_eq!(orch.state(), PipelineState::Indexed);

    // Same question again, no re-upload
    let answer = orch.ask(&question).await.unwrap();
    assert_eq!(answer.answer, "Answer to 'What is the capital of France?'");
    assert_eq!(orch.state(), PipelineState::Answered);
}

#[tokio::test]
async fn test_questions_are_independent() {
    let generator = Arc::new(RecordingGenerator::default());
    let mut orch = orchestrator(Arc::new(BagOfWordsEmbedder::default()), generator.clone());
    orch.upload(text_upload("france.txt", "Paris is the capital of France."))
        .await
        .unwrap();

    orch.ask(&AskRequest::new("What is the capital of France?")).await.unwrap();
    orch.ask(&AskRequest::new("Which country is Paris in?")).await.unwrap();

    let calls = generator.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, "Paris is the capital of France.");
    assert!(!calls[1].0.contains("Answer to"));
}

#[tokio::test]
async fn test_new_upload_replaces_index() {
    let mut orch = orchestrator(
        Arc::new(BagOfWordsEmbedder::default()),
        Arc::new(RecordingGenerator::default()),
    );

    orch.upload(text_upload("a.txt", "Paris is the capital of France."))
        .await
        .unwrap();
    orch.upload(text_upload("b.txt", "Rome is the capital of Italy."))
        .await
        .unwrap();

    let answer = orch
        .ask(&AskRequest::new("What is the capital of France?"))
        .await
        .unwrap();
    assert_eq!(answer.context.len(), 1);
    assert_eq!(answer.context[0].chunk.content, "Rome is the capital of Italy.");
}

#[tokio::test]
async fn test_failed_upload_discards_previous_index() {
    let mut orch = orchestrator(
        Arc::new(BagOfWordsEmbedder::default()),
        Arc::new(RecordingGenerator::default()),
    );

    orch.upload(text_upload("a.txt", "Paris is the capital of France."))
        .await
        .unwrap();
    assert!(orch.upload(text_upload("empty.txt", "")).await.is_err());

    let err = orch.ask(&AskRequest::new("What is the capital?")).await.unwrap_err();
    assert!(matches!(err, Error::NoDocument));
}

#[tokio::test]
async fn test_docx_upload() {
    let generator = Arc::new(RecordingGenerator::default());
    let mut orch = orchestrator(Arc::new(BagOfWordsEmbedder::default()), generator.clone());

    let upload = Upload::new(
        "notes.docx",
        Some(askmynotes::types::document::DOCX_MIME.to_string()),
        docx_bytes(&["Meeting moved to Thursday.", "Bring the budget report."]),
    );
    let summary = orch.upload(upload).await.unwrap();
    assert_eq!(summary.chunks, 1);

    let answer = orch.ask(&AskRequest::new("When is the meeting?")).await.unwrap();
    assert_eq!(
        answer.context[0].chunk.content,
        "Meeting moved to Thursday.\nBring the budget report.\n"
    );
}

#[test]
fn test_extract_and_split_are_deterministic() {
    let body = "Line one of the notes.\nLine two follows here.\n\n".repeat(40);
    let upload = text_upload("notes.txt", &body);
    let splitter = TextSplitter::from_config(&ChunkingConfig::default()).unwrap();

    let run = || {
        let document = Document::from_upload(upload.clone()).unwrap();
        let extracted = TextExtractor::extract(&document).unwrap();
        splitter.split(&extracted.text).collect::<Vec<_>>()
    };

    let first = run();
    assert!(first.len() > 1);
    assert_eq!(first, run());
}
