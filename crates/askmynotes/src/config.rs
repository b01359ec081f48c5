//! Configuration for the note question-answering service
//!
//! Tunables live in a serde tree with defaults. The API credential is kept
//! out of that tree and passed explicitly to the providers that need it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Environment variable holding the Google API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "ASKMYNOTES_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Gemini provider configuration
    pub gemini: GeminiConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 20MB)
    pub max_upload_size: usize,
    /// Seconds without a request before a session is dropped
    pub session_idle_secs: u64,
    /// Live session cap; the least recently used idle session makes room
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 20 * 1024 * 1024,
            session_idle_secs: 3600,
            max_sessions: 1000,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between neighbouring chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    /// Check that the size/overlap pair can make progress
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Distance used by the vector index
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance
    #[default]
    L2,
    /// Cosine distance (1 - cosine similarity)
    Cosine,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Distance metric for nearest-neighbour search
    pub metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            metric: DistanceMetric::L2,
        }
    }
}

/// Gemini (Generative Language API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API base URL
    pub base_url: String,
    /// Embedding model name
    pub embedding_model: String,
    /// Requested embedding width (`outputDimensionality`)
    pub embedding_dimensions: usize,
    /// Generation model name
    pub generation_model: String,
    /// Sampling temperature for answers
    pub temperature: f32,
    /// Maximum answer length in tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Texts per batchEmbedContents request (API limit: 100)
    pub embed_batch_size: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            embedding_dimensions: 768,
            generation_model: "gemini-2.5-flash".to_string(),
            temperature: 0.3,
            max_output_tokens: 1000,
            timeout_secs: 60,
            embed_batch_size: 100,
        }
    }
}

/// API key with a redacted `Debug`
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank values
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::Config(format!("{} is empty", API_KEY_ENV)));
        }
        Ok(Self(key.to_string()))
    }

    /// Raw key for request headers
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Credentials shared by the embedding and generation providers
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: ApiKey,
}

impl Credentials {
    /// Read the credential from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the credential through an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(API_KEY_ENV).ok_or_else(|| {
            Error::Config(format!(
                "{} not found. Add it to your environment or .env file.",
                API_KEY_ENV
            ))
        })?;

        Ok(Self {
            api_key: ApiKey::new(raw)?,
        })
    }
}

impl AppConfig {
    /// Load configuration: `.env`, optional TOML file, env overrides
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(host) = lookup("ASKMYNOTES_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("ASKMYNOTES_PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid ASKMYNOTES_PORT '{}': {}", port, e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.server.session_idle_secs == 0 {
            return Err(Error::Config(
                "server.session_idle_secs must be at least 1".to_string(),
            ));
        }
        if self.server.max_sessions == 0 {
            return Err(Error::Config("server.max_sessions must be at least 1".to_string()));
        }
        if self.gemini.embedding_dimensions == 0 {
            return Err(Error::Config(
                "gemini.embedding_dimensions must be at least 1".to_string(),
            ));
        }
        if self.gemini.embed_batch_size == 0 || self.gemini.embed_batch_size > 100 {
            return Err(Error::Config(
                "gemini.embed_batch_size must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_match_original_pipeline() {
        let config = AppConfig::default();
        assert_eq!(config.chunking.chunk_size, 300);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.metric, DistanceMetric::L2);
        assert!((config.gemini.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.gemini.max_output_tokens, 1000);
    }

    #[test]
    fn test_missing_credential_is_config_error() {
        let vars = env(&[]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_blank_credential_is_config_error() {
        let vars = env(&[(API_KEY_ENV, "   ")]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let vars = env(&[(API_KEY_ENV, "secret-key")]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.api_key.expose(), "secret-key");
        assert!(!format!("{:?}", creds).contains("secret-key"));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[("ASKMYNOTES_HOST", "127.0.0.1"), ("ASKMYNOTES_PORT", "9000")]);
        let config = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_bad_port_is_config_error() {
        let vars = env(&[("ASKMYNOTES_PORT", "eighty")]);
        assert!(matches!(
            AppConfig::from_lookup(|k| vars.get(k).cloned()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_toml_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[chunking]\nchunk_size = 500\n\n[retrieval]\nmetric = \"cosine\"\ntop_k = 5"
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let vars = env(&[(CONFIG_PATH_ENV, &path)]);
        let config = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.retrieval.metric, DistanceMetric::Cosine);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.gemini.generation_model, "gemini-2.5-flash");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let chunking = ChunkingConfig {
            chunk_size: 50,
            chunk_overlap: 50,
        };
        assert!(chunking.validate().is_err());
    }

    #[test]
    fn test_session_limits_must_be_positive() {
        let mut config = AppConfig::default();
        assert_eq!(config.server.session_idle_secs, 3600);
        assert_eq!(config.server.max_sessions, 1000);
        config.server.max_sessions = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = AppConfig::default();
        config.server.session_idle_secs = 0;
        assert!(config.validate().is_err());
    }
}
