//! Text embedding providers.
//!
//! Ingestion and serving must embed with the same model, otherwise query
//! vectors are meaningless against the stored ones. Every vector returned by an
//! [`Embedder`] is checked against its declared dimension.

use crate::types::{AppError, Result};
use crate::utils::toml_config::EmbeddingConfig;
use async_openai::{config::OpenAIConfig, error::OpenAIError, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    /// Embed a batch of passages, one vector per input in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Embedding("embedder returned no vector".to_string()))
    }
}

/// Check count and dimension of a provider response.
pub fn validate_embeddings(
    model: &str,
    expected_count: usize,
    expected_dim: usize,
    vectors: &[Vec<f32>],
) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(AppError::Embedding(format!(
            "{} returned {} vectors for {} inputs",
            model,
            vectors.len(),
            expected_count
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected_dim) {
        return Err(AppError::Configuration(format!(
            "embedding model '{}' produced {}-dimensional vectors, configured for {}",
            model,
            bad.len(),
            expected_dim
        )));
    }
    Ok(())
}

// ============================================================================
// Local (fastembed)
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::{validate_embeddings, Embedder};
    use crate::types::{AppError, Result};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// In-process ONNX embedding model. Downloads weights on first use.
    pub struct LocalEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        model_name: String,
        dimensions: usize,
    }

    impl LocalEmbedder {
        pub fn new(model_name: &str, dimensions: usize) -> Result<Self> {
            let kind = parse_model(model_name)?;
            let model = TextEmbedding::try_new(
                InitOptions::new(kind).with_show_download_progress(true),
            )
            .map_err(|e| AppError::Embedding(format!("failed to load '{}': {}", model_name, e)))?;

            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                model_name: model_name.to_string(),
                dimensions,
            })
        }
    }

    fn parse_model(name: &str) -> Result<EmbeddingModel> {
        match name {
            "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
                Ok(EmbeddingModel::AllMiniLML6V2)
            }
            "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            other => Err(AppError::Configuration(format!(
                "unsupported local embedding model '{}'",
                other
            ))),
        }
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let model = Arc::clone(&self.model);
            let inputs = texts.to_vec();
            let vectors = tokio::task::spawn_blocking(move || model.lock().embed(inputs, None))
                .await
                .map_err(|e| AppError::Internal(format!("embedding task panicked: {}", e)))?
                .map_err(|e| AppError::Embedding(e.to_string()))?;

            validate_embeddings(&self.model_name, texts.len(), self.dimensions, &vectors)?;
            Ok(vectors)
        }
    }

}

// ============================================================================
// OpenAI-compatible endpoint
// ============================================================================

/// Client for any server implementing the OpenAI `/embeddings` endpoint,
/// such as text-embeddings-inference serving all-MiniLM-L6-v2.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn new(api_base: &str, api_key: Option<String>, model: &str, dimensions: usize) -> Self {
        let mut config = OpenAIConfig::new().with_api_base(api_base);
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts.to_vec())
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| match e {
                OpenAIError::Reqwest(err) => {
                    AppError::Unavailable(format!("embedding request failed: {}", err))
                }
                other => AppError::Embedding(other.to_string()),
            })?;

        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        let vectors: Vec<Vec<f32>> = data.into_iter().map(|item| item.embedding).collect();

        validate_embeddings(&self.model, texts.len(), self.dimensions, &vectors)?;
        Ok(vectors)
    }
}

/// Build the embedder selected by the `[embedding]` config section.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config {
        #[cfg(feature = "local-embeddings")]
        EmbeddingConfig::FastEmbed { model, dimensions } => {
            Ok(Arc::new(LocalEmbedder::new(model, *dimensions)?))
        }
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingConfig::FastEmbed { .. } => Err(AppError::Configuration(
            "embedding type 'fastembed' requires the 'local-embeddings' feature".to_string(),
        )),
        EmbeddingConfig::OpenAI {
            api_base,
            api_key_env,
            model,
            dimensions,
        } => {
            let api_key = match api_key_env {
                Some(env) => Some(
                    std::env::var(env)
                        .ok()
                        .filter(|v| !v.trim().is_empty())
                        .ok_or_else(|| {
                            AppError::Configuration(format!(
                                "Environment variable '{}' is not set",
                                env
                            ))
                        })?,
                ),
                None => None,
            };
            Ok(Arc::new(OpenAIEmbedder::new(api_base, api_key, model, *dimensions)))
        }
    }
}
