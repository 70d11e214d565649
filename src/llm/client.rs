//! LLM Client abstractions and provider management
//!
//! The chatbot only ever sends one system instruction and one user turn, so
//! the trait stays small. Groq, OpenAI and any other server that speaks the
//! OpenAI chat-completions protocol are reached through [`Provider::OpenAI`].

use crate::types::{AppError, Result};
use crate::utils::toml_config::AppConfig;
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Sampling options passed through to the provider when set
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI-compatible chat-completions API (Groq in this deployment)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "gsk_...".to_string(),
    ///     api_base: "https://api.groq.com/openai/v1".to_string(),
    ///     model: "llama-3.1-8b-instant".to_string(),
    ///     options: GenerationOptions::default(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        options: GenerationOptions,
    },
}

impl Provider {
    /// Build the provider described by the `[llm]` section, resolving the key
    /// from the environment
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config
            .llm_api_key()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        Ok(Provider::OpenAI {
            api_key,
            api_base: config.llm.api_base.clone(),
            model: config.llm.model.clone(),
            options: GenerationOptions {
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            },
        })
    }

    /// Create a client instance for this provider
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                options,
            } => {
                if model.trim().is_empty() {
                    return Err(AppError::Configuration("LLM model name is empty".into()));
                }
                Ok(Box::new(super::openai::OpenAIClient::new(
                    api_key.clone(),
                    api_base.clone(),
                    model.clone(),
                    *options,
                )))
            }
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI-compatible",
        }
    }
}
