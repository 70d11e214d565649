//! Vector Store Abstraction Layer
//!
//! A single trait covers what both flows need from the index store:
//! ingestion creates the index and upserts records, serving runs top-k
//! similarity queries.
//!
//! ```text
//!  ingest ──► ensure_index ─► upsert ─┐
//!                                     ▼
//!                              ┌─────────────┐
//!                              │ VectorStore │ ◄── PineconeStore (production)
//!                              └─────────────┘ ◄── InMemoryVectorStore (tests)
//!                                     ▲
//!  serve  ──────────────► query ──────┘
//! ```

use crate::types::{AppError, IndexRecord, Result, SearchResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Index Specification
// ============================================================================

/// Similarity metric an index is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl std::str::FromStr for DistanceMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "dotproduct" | "dot_product" | "dot" => Ok(Self::DotProduct),
            _ => Err(AppError::Configuration(format!(
                "Unknown distance metric: {}. Use: cosine, euclidean, dotproduct",
                s
            ))),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        };
        write!(f, "{}", name)
    }
}

/// Everything needed to create an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    /// Serverless hosting cloud (e.g. "aws").
    pub cloud: String,
    /// Serverless hosting region (e.g. "us-east-1").
    pub region: String,
}

/// Statistics about an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub name: String,
    pub dimension: usize,
    pub record_count: usize,
    pub metric: DistanceMetric,
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Abstract trait for index store operations.
///
/// # Implementors
///
/// - `PineconeStore` - Managed cloud service (production)
/// - `InMemoryVectorStore` - Testing only
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this vector store provider.
    fn provider_name(&self) -> &'static str;

    /// Check if an index exists.
    async fn index_exists(&self, name: &str) -> Result<bool>;

    /// Create a new index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index already exists or creation fails.
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Get statistics about an index. Fails with `NotFound` if it is absent.
    async fn describe_index(&self, name: &str) -> Result<IndexStats>;

    /// Upsert records into an index, returning how many were written.
    ///
    /// Records are identified by their `id`; writing an existing id replaces it.
    async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<usize>;

    /// Return at most `top_k` records nearest to `embedding`, best first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the index does not exist, `Configuration` when the
    /// embedding dimension differs from the index dimension.
    async fn query(&self, index: &str, embedding: &[f32], top_k: usize)
        -> Result<Vec<SearchResult>>;

    /// Block until an existing index can serve reads and writes.
    ///
    /// Stores whose indexes are usable as soon as they exist keep the default.
    async fn wait_until_ready(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Create the index if it is absent, then check that its dimension matches.
    ///
    /// An index that exists but is still initializing is waited on.
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexStats> {
        if self.index_exists(&spec.name).await? {
            self.wait_until_ready(&spec.name).await?;
        } else {
            tracing::info!(
                index = %spec.name,
                dimension = spec.dimension,
                metric = %spec.metric,
                provider = self.provider_name(),
                "Creating index"
            );
            self.create_index(spec).await?;
        }

        let stats = self.describe_index(&spec.name).await?;
        check_dimension(&spec.name, stats.dimension, spec.dimension)?;
        Ok(stats)
    }
}

/// Fail with a `Configuration` error when vector and index dimensions differ.
pub fn check_dimension(index: &str, index_dimension: usize, vector_dimension: usize) -> Result<()> {
    if index_dimension != vector_dimension {
        return Err(AppError::Configuration(format!(
            "Dimension mismatch for index '{}': index has {}, embeddings have {}",
            index, index_dimension, vector_dimension
        )));
    }
    Ok(())
}

// ============================================================================
// In-Memory Vector Store (for testing)
// ============================================================================

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory vector store for testing purposes.
///
/// Data is not persisted and will be lost when the process exits.
/// Uses cosine similarity regardless of the metric the index was created with.
pub struct InMemoryVectorStore {
    indexes: Arc<RwLock<HashMap<String, InMemoryIndex>>>,
}

struct InMemoryIndex {
    spec: IndexSpec,
    records: HashMap<String, IndexRecord>,
}

impl InMemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            indexes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn not_found(name: &str) -> AppError {
        AppError::NotFound(format!("Index '{}' not found", name))
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn index_exists(&self, name: &str) -> Result<bool> {
        Ok(self.indexes.read().contains_key(name))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(&spec.name) {
            return Err(AppError::InvalidInput(format!(
                "Index '{}' already exists",
                spec.name
            )));
        }
        indexes.insert(
            spec.name.clone(),
            InMemoryIndex {
                spec: spec.clone(),
                records: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> Result<IndexStats> {
        let indexes = self.indexes.read();
        let index = indexes.get(name).ok_or_else(|| Self::not_found(name))?;

        Ok(IndexStats {
            name: name.to_string(),
            dimension: index.spec.dimension,
            record_count: index.records.len(),
            metric: index.spec.metric,
        })
    }

    async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<usize> {
        let mut indexes = self.indexes.write();
        let target = indexes.get_mut(index).ok_or_else(|| Self::not_found(index))?;

        for record in records {
            check_dimension(index, target.spec.dimension, record.embedding.len())?;
        }
        for record in records {
            target.records.insert(record.id.clone(), record.clone());
        }

        Ok(records.len())
    }

    async fn query(
        &self,
        index: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let indexes = self.indexes.read();
        let target = indexes.get(index).ok_or_else(|| Self::not_found(index))?;
        check_dimension(index, target.spec.dimension, embedding.len())?;

        let mut results: Vec<SearchResult> = target
            .records
            .values()
            .map(|record| SearchResult {
                id: record.id.clone(),
                content: record.content.clone(),
                metadata: record.metadata.clone(),
                score: Self::cosine_similarity(embedding, &record.embedding),
            })
            .collect();

        // Sort by score descending, id as a stable tiebreak
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(top_k);

        Ok(results)
    }
}

// ============================================================================
// Tests
// ============================================================================
