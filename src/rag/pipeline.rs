//! Question answering over the index: embed the question, fetch the nearest
//! chunks, fold them into the prompt and ask the LLM.

use crate::db::{check_dimension, IndexStats, VectorStore};
use crate::llm::LLMClient;
use crate::rag::embeddings::Embedder;
use crate::rag::prompt::PromptTemplate;
use crate::types::{AppError, Result, SearchResult};
use crate::utils::retry::RetryPolicy;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub index_name: String,
    pub top_k: usize,
    pub prompt: PromptTemplate,
    pub retry: RetryPolicy,
}

/// Generated answer together with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub context: Vec<SearchResult>,
}

pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LLMClient>,
    config: PipelineConfig,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LLMClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            config,
        }
    }

    /// Confirm the index exists and matches the embedder before serving.
    ///
    /// # Errors
    ///
    /// `NotFound` when the index is missing (ingestion has not run),
    /// `Configuration` when its dimension differs from the embedder's.
    pub async fn check_index(&self) -> Result<IndexStats> {
        let index = &self.config.index_name;
        let stats = self
            .config
            .retry
            .execute("describe index", || self.store.describe_index(index))
            .await?;
        check_dimension(index, stats.dimension, self.embedder.dimensions())?;

        info!(
            index = %index,
            dimension = stats.dimension,
            records = stats.record_count,
            "Index checked"
        );
        Ok(stats)
    }

    /// Return at most `top_k` chunks nearest to `query`, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query = validate_query(query)?;
        let retry = &self.config.retry;

        let embedding = retry
            .execute("embed query", || self.embedder.embed_query(query))
            .await?;

        let mut results = retry
            .execute("index query", || {
                self.store
                    .query(&self.config.index_name, &embedding, self.config.top_k)
            })
            .await?;
        results.truncate(self.config.top_k);

        debug!(
            index = %self.config.index_name,
            results = results.len(),
            top_score = results.first().map(|r| r.score),
            "Retrieved context"
        );
        Ok(results)
    }

    /// Answer `query` grounded on retrieved context. An empty index still
    /// produces an answer, generated with empty context.
    #[instrument(skip(self, query), fields(model = self.llm.model_name()))]
    pub async fn answer(&self, query: &str) -> Result<RagAnswer> {
        let started = Instant::now();
        let query = validate_query(query)?;
        info!(query_len = query.len(), "Answering question");

        let context = self.retrieve(query).await?;
        let prompt = self.config.prompt.assemble(query, &context);

        let answer = self
            .config
            .retry
            .execute("generate answer", || {
                self.llm.generate_with_system(&prompt.system, &prompt.user)
            })
            .await?;

        info!(
            context_chunks = context.len(),
            answer_len = answer.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Answer generated"
        );
        Ok(RagAnswer { answer, context })
    }
}

fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("query must not be empty".to_string()));
    }
    Ok(trimmed)
}
