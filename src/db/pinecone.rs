//! Pinecone vector database integration.
//!
//! Talks to Pinecone's REST API directly with `reqwest`:
//!
//! - **Control plane** (`https://api.pinecone.io`): describe and create
//!   serverless indexes.
//! - **Data plane** (the per-index host returned by describe): upsert,
//!   query and stats.
//!
//! Chunk text is stored in record metadata under `text`, next to `source`,
//! `page` and `chunk_index`, so query results carry everything the prompt
//! assembler needs without a second lookup.
//!
//! # Example
//!
//! ```rust,ignore
//! use medrag::db::{PineconeConfig, PineconeStore, VectorStore};
//!
//! let config = PineconeConfig::default();
//! let store = PineconeStore::new(api_key, &config)?;
//! let spec = config.index_spec(384)?;
//! store.ensure_index(&spec).await?;
//! let results = store.query(&spec.name, &query_embedding, 3).await?;
//! ```

use super::vectorstore::{check_dimension, DistanceMetric, IndexSpec, IndexStats, VectorStore};
use crate::types::{AppError, ChunkMetadata, IndexRecord, Result, SearchResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// ============================================================================
// Configuration
// ============================================================================

/// `[vector_store]` section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    /// Environment variable containing the Pinecone API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Record namespace inside the index ("" is Pinecone's default namespace)
    #[serde(default)]
    pub namespace: String,

    #[serde(default = "default_metric")]
    pub metric: String,

    #[serde(default = "default_cloud")]
    pub cloud: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// How long to wait for a freshly created index to become ready
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}

fn default_index_name() -> String {
    "medical-chatbot".to_string()
}

fn default_metric() -> String {
    "cosine".to_string()
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_control_plane_url() -> String {
    "https://api.pinecone.io".to_string()
}

fn default_api_version() -> String {
    "2024-07".to_string()
}

fn default_ready_timeout_secs() -> u64 {
    120
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            index_name: default_index_name(),
            namespace: String::new(),
            metric: default_metric(),
            cloud: default_cloud(),
            region: default_region(),
            control_plane_url: default_control_plane_url(),
            api_version: default_api_version(),
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

impl PineconeConfig {
    /// Index specification for vectors of the given dimension.
    pub fn index_spec(&self, dimension: usize) -> Result<IndexSpec> {
        Ok(IndexSpec {
            name: self.index_name.clone(),
            dimension,
            metric: self.metric.parse()?,
            cloud: self.cloud.clone(),
            region: self.region.clone(),
        })
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct IndexModel {
    dimension: usize,
    metric: DistanceMetric,
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeIndexStatsResponse {
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Resolved data-plane location of an index.
#[derive(Debug, Clone)]
struct IndexHandle {
    base_url: String,
    dimension: usize,
    metric: DistanceMetric,
}

// ============================================================================
// Store
// ============================================================================

pub struct PineconeStore {
    http: reqwest::Client,
    control_plane_url: String,
    namespace: String,
    ready_timeout: Duration,
    ready_poll_interval: Duration,
    handles: RwLock<HashMap<String, IndexHandle>>,
}

impl PineconeStore {
    /// Create a client for the Pinecone project owning `api_key`.
    pub fn new(api_key: String, config: &PineconeConfig) -> Result<Self> {
        let mut api_key_header = HeaderValue::from_str(&api_key).map_err(|_| {
            AppError::Configuration("Pinecone API key contains invalid characters".to_string())
        })?;
        api_key_header.set_sensitive(true);

        let version_header = HeaderValue::from_str(&config.api_version).map_err(|_| {
            AppError::Configuration(format!(
                "Invalid Pinecone API version: {}",
                config.api_version
            ))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert("api-key", api_key_header);
        headers.insert("x-pinecone-api-version", version_header);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            ready_timeout: Duration::from_secs(config.ready_timeout_secs),
            ready_poll_interval: Duration::from_secs(1),
            handles: RwLock::new(HashMap::new()),
        })
    }

    /// Override how often readiness is polled after `create_index`.
    pub fn with_ready_poll_interval(mut self, interval: Duration) -> Self {
        self.ready_poll_interval = interval;
        self
    }

    async fn describe(&self, name: &str) -> Result<IndexModel> {
        let url = format!("{}/indexes/{}", self.control_plane_url, name);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(e, "describe index"))?;
        let response = check_response(response, &format!("describe index '{}'", name)).await?;

        response
            .json::<IndexModel>()
            .await
            .map_err(|e| AppError::VectorStore(format!("Invalid describe-index response: {}", e)))
    }

    fn remember(&self, name: &str, model: &IndexModel) -> IndexHandle {
        let handle = IndexHandle {
            base_url: data_plane_url(&model.host),
            dimension: model.dimension,
            metric: model.metric,
        };
        self.handles.write().insert(name.to_string(), handle.clone());
        handle
    }

    /// Data-plane handle for an index, describing it on first use.
    async fn handle(&self, name: &str) -> Result<IndexHandle> {
        if let Some(handle) = self.handles.read().get(name) {
            return Ok(handle.clone());
        }

        let model = self.describe(name).await?;
        Ok(self.remember(name, &model))
    }

    async fn poll_until_ready(&self, name: &str) -> Result<IndexModel> {
        let started = Instant::now();
        loop {
            let model = self.describe(name).await?;
            if model.status.ready {
                return Ok(model);
            }
            if started.elapsed() >= self.ready_timeout {
                return Err(AppError::Unavailable(format!(
                    "Index '{}' not ready after {:?} (state: {})",
                    name, self.ready_timeout, model.status.state
                )));
            }
            debug!(index = name, state = %model.status.state, "Waiting for index");
            tokio::time::sleep(self.ready_poll_interval).await;
        }
    }

    async fn post_data_plane<T: for<'de> Deserialize<'de>>(
        &self,
        handle: &IndexHandle,
        path: &str,
        body: &Value,
        context: &str,
    ) -> Result<T> {
        let url = format!("{}{}", handle.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, context))?;
        let response = check_response(response, context).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::VectorStore(format!("Invalid {} response: {}", context, e)))
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn provider_name(&self) -> &'static str {
        "pinecone"
    }

    async fn index_exists(&self, name: &str) -> Result<bool> {
        match self.describe(name).await {
            Ok(model) => {
                self.remember(name, &model);
                Ok(true)
            }
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn wait_until_ready(&self, name: &str) -> Result<()> {
        let model = self.poll_until_ready(name).await?;
        self.remember(name, &model);
        Ok(())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let url = format!("{}/indexes", self.control_plane_url);
        let body = json!({
            "name": spec.name,
            "dimension": spec.dimension,
            "metric": spec.metric.to_string(),
            "spec": {
                "serverless": {
                    "cloud": spec.cloud,
                    "region": spec.region,
                }
            }
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, "create index"))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(AppError::InvalidInput(format!(
                "Index '{}' already exists",
                spec.name
            )));
        }
        check_response(response, &format!("create index '{}'", spec.name)).await?;

        let model = self.poll_until_ready(&spec.name).await?;
        self.remember(&spec.name, &model);
        info!(index = %spec.name, host = %model.host, "Index ready");
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> Result<IndexStats> {
        let handle = self.handle(name).await?;
        let stats: DescribeIndexStatsResponse = self
            .post_data_plane(&handle, "/describe_index_stats", &json!({}), "describe index stats")
            .await?;

        Ok(IndexStats {
            name: name.to_string(),
            dimension: stats.dimension.unwrap_or(handle.dimension),
            record_count: stats.total_vector_count,
            metric: handle.metric,
        })
    }

    async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let handle = self.handle(index).await?;
        for record in records {
            check_dimension(index, handle.dimension, record.embedding.len())?;
        }

        let vectors: Vec<Value> = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "values": record.embedding,
                    "metadata": record_metadata(record),
                })
            })
            .collect();

        let body = json!({
            "vectors": vectors,
            "namespace": self.namespace,
        });

        let response: UpsertResponse = self
            .post_data_plane(&handle, "/vectors/upsert", &body, "upsert")
            .await?;

        debug!(index, upserted = response.upserted_count, "Upsert complete");
        Ok(response.upserted_count)
    }

    async fn query(
        &self,
        index: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let handle = self.handle(index).await?;
        check_dimension(index, handle.dimension, embedding.len())?;

        let body = json!({
            "vector": embedding,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
            "namespace": self.namespace,
        });

        let response: QueryResponse = self
            .post_data_plane(&handle, "/query", &body, "query")
            .await?;

        let mut results: Vec<SearchResult> = response
            .matches
            .into_iter()
            .map(search_result_from_match)
            .collect();
        results.truncate(top_k);

        Ok(results)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Pinecone reports hosts without a scheme; tests and proxies may include one.
fn data_plane_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn record_metadata(record: &IndexRecord) -> Value {
    let mut metadata = Map::new();
    metadata.insert("text".to_string(), json!(record.content));
    metadata.insert("source".to_string(), json!(record.metadata.source));
    metadata.insert("chunk_index".to_string(), json!(record.metadata.chunk_index));
    if let Some(page) = record.metadata.page {
        metadata.insert("page".to_string(), json!(page));
    }
    Value::Object(metadata)
}

fn search_result_from_match(m: QueryMatch) -> SearchResult {
    let metadata = m.metadata.unwrap_or_default();

    // Pinecone returns every number as a float
    let as_u64 = |key: &str| metadata.get(key).and_then(Value::as_f64).map(|n| n as u64);

    SearchResult {
        id: m.id,
        content: metadata
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        metadata: ChunkMetadata {
            source: metadata
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            page: as_u64("page").map(|n| n as u32),
            chunk_index: as_u64("chunk_index").unwrap_or(0) as usize,
        },
        score: m.score,
    }
}

fn transport_error(e: reqwest::Error, context: &str) -> AppError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        AppError::Unavailable(format!("Pinecone {} failed: {}", context, e))
    } else {
        AppError::VectorStore(format!("Pinecone {} failed: {}", context, e))
    }
}

async fn check_response(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("Pinecone {} returned {}: {}", context, status, body);

    Err(match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Configuration(message),
        StatusCode::TOO_MANY_REQUESTS => AppError::Unavailable(message),
        s if s.is_server_error() => AppError::Unavailable(message),
        _ => AppError::VectorStore(message),
    })
}
