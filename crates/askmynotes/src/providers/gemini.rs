//! Gemini providers over the Generative Language REST API
//!
//! One API key serves both the embedding model and the generation model.
//! Requests are not retried; a failed call surfaces as an error for the
//! current operation.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::config::{ApiKey, Credentials, GeminiConfig};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::embedding::EmbeddingProvider;
use super::generator::AnswerGenerator;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Shared HTTP plumbing for the Gemini endpoints
#[derive(Clone)]
struct GeminiHttp {
    client: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

impl GeminiHttp {
    fn new(config: &GeminiConfig, credentials: &Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    /// POST a JSON body and decode the JSON reply; errors are plain messages
    async fn post<Req, Resp>(&self, url: &str, body: &Req) -> std::result::Result<Resp, String>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("{}: {}", status, body));
        }

        response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {}", e))
    }
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn text(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: Content,
    task_type: &'static str,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Embedding provider backed by `embedContent` / `batchEmbedContents`
pub struct GeminiEmbedder {
    http: GeminiHttp,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl GeminiEmbedder {
    pub fn new(config: &GeminiConfig, credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            http: GeminiHttp::new(config, credentials)?,
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
            batch_size: config.embed_batch_size.max(1),
        })
    }

    fn request(&self, text: &str, task_type: &'static str) -> EmbedRequest {
        EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content::text(text),
            task_type,
            output_dimensionality: self.dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tracing::debug!("Embedding query ({} chars) with {}", text.len(), self.model);

        let url = self.http.endpoint(&self.model, "embedContent");
        let response: EmbedResponse = self
            .http
            .post(&url, &self.request(text, "RETRIEVAL_QUERY"))
            .await
            .map_err(|e| Error::embedding(format!("Gemini embedContent {}", e)))?;

        Ok(response.embedding.values)
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.http.endpoint(&self.model, "batchEmbedContents");
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            tracing::debug!("Embedding batch of {} chunks with {}", batch.len(), self.model);

            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|t| self.request(t, "RETRIEVAL_DOCUMENT"))
                    .collect(),
            };

            let response: BatchEmbedResponse = self
                .http
                .post(&url, &request)
                .await
                .map_err(|e| Error::embedding(format!("Gemini batchEmbedContents {}", e)))?;

            all_embeddings.extend(batch_values(response, batch.len())?);
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn batch_values(response: BatchEmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.embeddings.len() != expected {
        return Err(Error::embedding(format!(
            "Gemini returned {} embeddings for {} texts",
            response.embeddings.len(),
            expected
        )));
    }
    Ok(response.embeddings.into_iter().map(|e| e.values).collect())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Answer generator backed by `generateContent`
pub struct GeminiClient {
    http: GeminiHttp,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            http: GeminiHttp::new(config, credentials)?,
            model: config.generation_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn request(&self, prompt: String) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl AnswerGenerator for GeminiClient {
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        let prompt = PromptBuilder::build_prompt(context, question);
        tracing::debug!("Generating answer with {} ({} prompt chars)", self.model, prompt.len());

        let url = self.http.endpoint(&self.model, "generateContent");
        let response: GenerateResponse = self
            .http
            .post(&url, &self.request(prompt))
            .await
            .map_err(|e| Error::answer_generation(format!("Gemini generateContent {}", e)))?;

        answer_text(response)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Concatenate the text parts of the first candidate
fn answer_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::answer_generation("No text in Gemini response"));
    }
    Ok(text)
}
