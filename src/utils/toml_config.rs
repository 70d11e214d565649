//! TOML-based configuration for medrag
//!
//! Every section has defaults that reproduce the deployed chatbot (Pinecone
//! index `medical-chatbot`, 384-dim MiniLM embeddings, Groq
//! `llama-3.1-8b-instant`, k = 3), so `medrag.toml` is optional. Secrets are
//! never stored in the file: `*_env` keys name the environment variables that
//! hold them, and `validate_*` checks those variables before anything runs.

use crate::db::pinecone::PineconeConfig;
use crate::rag::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::utils::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from medrag.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub vector_store: PineconeConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmbeddingConfig {
    /// In-process ONNX model (requires the `local-embeddings` feature)
    FastEmbed {
        #[serde(default = "default_embedding_model")]
        model: String,
        #[serde(default = "default_embedding_dimensions")]
        dimensions: usize,
    },
    /// Any OpenAI-compatible `/embeddings` endpoint
    OpenAI {
        #[serde(default = "default_embedding_api_base")]
        api_base: String,
        /// Environment variable containing the API key, if the endpoint needs one
        api_key_env: Option<String>,
        #[serde(default = "default_embedding_model")]
        model: String,
        #[serde(default = "default_embedding_dimensions")]
        dimensions: usize,
    },
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_embedding_dimensions() -> usize {
    384
}

fn default_embedding_api_base() -> String {
    "http://localhost:8080/v1".to_string()
}

impl Default for EmbeddingConfig {
    #[cfg(feature = "local-embeddings")]
    fn default() -> Self {
        EmbeddingConfig::FastEmbed {
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }

    #[cfg(not(feature = "local-embeddings"))]
    fn default() -> Self {
        EmbeddingConfig::OpenAI {
            api_base: default_embedding_api_base(),
            api_key_env: None,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }
}

impl EmbeddingConfig {
    pub fn dimensions(&self) -> usize {
        match self {
            EmbeddingConfig::FastEmbed { dimensions, .. } => *dimensions,
            EmbeddingConfig::OpenAI { dimensions, .. } => *dimensions,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            EmbeddingConfig::FastEmbed { model, .. } => model,
            EmbeddingConfig::OpenAI { model, .. } => model,
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL; Groq by default
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// Environment variable containing the API key
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,
}

fn default_llm_api_base() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_llm_api_base(),
            api_key_env: default_llm_api_key_env(),
            model: default_llm_model(),
            temperature: None,
            max_tokens: None,
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Texts per embedding request during ingestion
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    /// Records per upsert request during ingestion
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,

    /// System instruction; `{context}` is replaced by the retrieved chunks
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_top_k() -> usize {
    3
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    20
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_embed_batch_size() -> usize {
    32
}

fn default_upsert_batch_size() -> usize {
    100
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            data_dir: default_data_dir(),
            embed_batch_size: default_embed_batch_size(),
            upsert_batch_size: default_upsert_batch_size(),
            system_prompt: default_system_prompt(),
        }
    }
}

// ============= Retry Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    4_000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

// ============= Configuration Loading & Validation =============

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at the given path; built-in defaults apply.
    Defaults,
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' is not set (check your .env file)")]
    MissingEnvVar(String),
}

impl AppConfig {
    /// Parse configuration from a TOML string without validating it
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file, falling back to built-in
    /// defaults when the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_source(path).map(|(config, _)| config)
    }

    /// Load like [`AppConfig::load`], also reporting where the values came from.
    ///
    /// Nothing is logged here: the subscriber is configured from the result.
    pub fn load_with_source<P: AsRef<Path>>(path: P) -> Result<(Self, ConfigSource), ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Checks shared by both the server and the ingestion command
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rag.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "rag.top_k must be greater than 0".to_string(),
            ));
        }
        if self.rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.embed_batch_size == 0 || self.rag.upsert_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag batch sizes must be greater than 0".to_string(),
            ));
        }
        if self.embedding.dimensions() == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be greater than 0".to_string(),
            ));
        }
        if self.vector_store.index_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "vector_store.index_name must not be empty".to_string(),
            ));
        }

        self.validate_env_var(&self.vector_store.api_key_env)?;
        if let EmbeddingConfig::OpenAI {
            api_key_env: Some(env),
            ..
        } = &self.embedding
        {
            self.validate_env_var(env)?;
        }

        Ok(())
    }

    /// Everything `serve` needs: shared checks plus the LLM key
    pub fn validate_serving(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.validate_env_var(&self.llm.api_key_env)
    }

    /// Everything `ingest` needs
    pub fn validate_ingestion(&self) -> Result<(), ConfigError> {
        self.validate()
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        self.resolve_env(name)
            .map(|_| ())
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
    }

    /// Get a resolved, non-empty value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }

    /// Get the Pinecone API key from the environment
    pub fn pinecone_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.vector_store.api_key_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.vector_store.api_key_env.clone()))
    }

    /// Get the LLM API key from the environment
    pub fn llm_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.llm.api_key_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.llm.api_key_env.clone()))
    }

    /// Render the effective configuration (secrets are never part of it)
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
