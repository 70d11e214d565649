//! One-shot ingestion: load → split → embed → upsert.

use crate::db::{IndexSpec, VectorStore};
use crate::rag::chunker::{record_id, TextChunker};
use crate::rag::embeddings::Embedder;
use crate::rag::loader::DocumentLoader;
use crate::types::{AppError, IndexRecord, Result};
use crate::utils::retry::RetryPolicy;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files_loaded: usize,
    /// Files left out of the run, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    pub documents: usize,
    pub chunks: usize,
    pub records_upserted: usize,
    /// Record count reported by the index after the run.
    pub index_record_count: usize,
    pub elapsed_ms: u64,
}

impl IngestReport {
    pub fn files_skipped(&self) -> usize {
        self.skipped.len()
    }
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunker: TextChunker,
    index: IndexSpec,
    embed_batch_size: usize,
    upsert_batch_size: usize,
    retry: RetryPolicy,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chunker: TextChunker,
        index: IndexSpec,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker,
            index,
            embed_batch_size: 32,
            upsert_batch_size: 100,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_batch_sizes(mut self, embed_batch_size: usize, upsert_batch_size: usize) -> Self {
        self.embed_batch_size = embed_batch_size.max(1);
        self.upsert_batch_size = upsert_batch_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Ingest every supported file in `data_dir` into the configured index,
    /// creating the index first if needed.
    pub async fn run(&self, data_dir: &Path) -> Result<IngestReport> {
        let started = Instant::now();
        if self.index.dimension != self.embedder.dimensions() {
            return Err(AppError::Configuration(format!(
                "index '{}' is configured for {} dimensions but embedder '{}' produces {}",
                self.index.name,
                self.index.dimension,
                self.embedder.model_name(),
                self.embedder.dimensions()
            )));
        }

        let dir: PathBuf = data_dir.to_path_buf();
        let outcome = tokio::task::spawn_blocking(move || DocumentLoader::new(dir).load())
            .await
            .map_err(|e| AppError::Internal(format!("loader task panicked: {}", e)))??;

        let chunks = self.chunker.split_documents(&outcome.documents);
        info!(
            documents = outcome.documents.len(),
            chunks = chunks.len(),
            chunk_size = self.chunker.chunk_size(),
            chunk_overlap = self.chunker.chunk_overlap(),
            "Split documents"
        );

        // Readiness polling is bounded by the store itself
        self.retry
            .without_attempt_timeout()
            .execute("ensure index", || self.store.ensure_index(&self.index))
            .await?;

        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self
                .retry
                .execute("embed documents", || self.embedder.embed_documents(&texts))
                .await?;

            records.extend(batch.iter().zip(embeddings).map(|(chunk, embedding)| {
                IndexRecord {
                    id: record_id(chunk),
                    content: chunk.content.clone(),
                    metadata: chunk.metadata.clone(),
                    embedding,
                }
            }));
            debug!(embedded = records.len(), total = chunks.len(), "Embedded batch");
        }

        let mut upserted = 0;
        for batch in records.chunks(self.upsert_batch_size) {
            upserted += self
                .retry
                .execute("upsert", || self.store.upsert(&self.index.name, batch))
                .await?;
        }

        let stats = self.store.describe_index(&self.index.name).await?;
        let report = IngestReport {
            files_loaded: outcome.files_loaded,
            documents: outcome.documents.len(),
            skipped: outcome.skipped,
            chunks: chunks.len(),
            records_upserted: upserted,
            index_record_count: stats.record_count,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            index = %self.index.name,
            upserted = report.records_upserted,
            index_records = report.index_record_count,
            skipped = report.files_skipped(),
            elapsed_ms = report.elapsed_ms,
            "Ingestion complete"
        );
        Ok(report)
    }
}
