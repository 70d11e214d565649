//! Mock implementations for testing.
//!
//! Deterministic stand-ins for the remote embedding and LLM providers, shared
//! across test files without duplication.

use async_trait::async_trait;
use medrag::llm::LLMClient;
use medrag::rag::embeddings::Embedder;
use medrag::types::{AppError, Result};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TEST_DIMENSIONS: usize = 384;

#[derive(Clone)]
enum Behavior {
    Fixed(String),
    /// Reply with the system prompt, so tests can see the retrieved context.
    EchoSystem,
    Fail(fn(String) -> AppError),
}

/// Mock LLM client for testing with configurable responses.
///
/// # Examples
///
/// ```ignore
/// let client = MockLLMClient::new("Aspirin reduces fever.");
/// let client = MockLLMClient::echo_system();
/// let client = MockLLMClient::failing();
/// let client = MockLLMClient::new("ok").failing_first(2);
/// ```
#[derive(Clone)]
pub struct MockLLMClient {
    behavior: Behavior,
    transient_failures: usize,
    calls: Arc<AtomicUsize>,
    last_prompt: Arc<Mutex<Option<(String, String)>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self::with_behavior(Behavior::Fixed(response.to_string()))
    }

    pub fn echo_system() -> Self {
        Self::with_behavior(Behavior::EchoSystem)
    }

    /// Create a mock client that always returns a non-transient error.
    pub fn failing() -> Self {
        Self::with_behavior(Behavior::Fail(AppError::LLM))
    }

    /// Create a mock client that always returns a transient error.
    pub fn unavailable() -> Self {
        Self::with_behavior(Behavior::Fail(AppError::Unavailable))
    }

    /// Fail with `Unavailable` for the first `n` calls, then behave normally.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.transient_failures = n;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The (system, user) pair of the most recent call.
    pub fn last_prompt(&self) -> Option<(String, String)> {
        self.last_prompt.lock().clone()
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            transient_failures: 0,
            calls: Arc::new(AtomicUsize::new(0)),
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }

    fn respond(&self, system: &str, prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some((system.to_string(), prompt.to_string()));

        if call < self.transient_failures {
            return Err(AppError::Unavailable("Mock LLM rate limited".to_string()));
        }

        match &self.behavior {
            Behavior::Fixed(response) => Ok(response.clone()),
            Behavior::EchoSystem => Ok(system.to_string()),
            Behavior::Fail(make) => Err(make("Mock LLM failure".to_string())),
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.respond("", prompt)
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.respond(system, prompt)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Deterministic bag-of-words embedder.
///
/// Each non-stopword token is hashed into one of `dimensions` buckets and the
/// result is L2-normalized, so texts sharing words have positive cosine
/// similarity and identical texts embed identically.
pub struct HashEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
}

const STOPWORDS: &[&str] = &[
    "what", "does", "do", "is", "the", "a", "an", "and", "of", "to", "in", "for", "it", "how",
    "are", "be", "can", "with", "on", "by",
];

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_dimensions(TEST_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed_documents` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty() && !STOPWORDS.contains(&t.as_str()))
        {
            let digest = Sha256::digest(token.as_bytes());
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bytes) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-embedder"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
