//! # medrag - Retrieval-augmented medical chatbot
//!
//! Answers natural-language medical questions from a corpus of reference
//! PDFs. Documents are split into chunks, embedded, and stored in a Pinecone
//! index; each question retrieves the closest chunks and a Groq-hosted LLM
//! answers from them.
//!
//! ## Overview
//!
//! medrag can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `medrag-server` binary
//!    (`ingest` once, then `serve`)
//! 2. **As a library** - Assemble the pipeline in your own Rust project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use medrag::{AppConfig, RagPipeline, PipelineConfig, PineconeStore, Provider};
//! use medrag::rag::embeddings::create_embedder;
//! use std::sync::Arc;
//!
//! let config = AppConfig::load("medrag.toml")?;
//! config.validate_serving()?;
//!
//! let embedder = create_embedder(&config.embedding)?;
//! let store = Arc::new(PineconeStore::new(config.pinecone_api_key()?, &config.vector_store)?);
//! let llm = Provider::from_config(&config)?.create_client()?;
//!
//! let pipeline = RagPipeline::new(embedder, store, Arc::from(llm), PipelineConfig {
//!     index_name: config.vector_store.index_name.clone(),
//!     top_k: config.rag.top_k,
//!     prompt: PromptTemplate::new(&config.rag.system_prompt),
//!     retry: config.retry.policy(),
//! });
//!
//! let answer = pipeline.answer("What does aspirin do?").await?;
//! println!("{}", answer.answer);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `local-embeddings` | In-process all-MiniLM-L6-v2 via fastembed |
//!
//! ## Modules
//!
//! - [`api`] - HTTP handlers and routes
//! - [`cli`] - Command-line parsing and terminal output
//! - [`db`] - Vector index clients (Pinecone, in-memory)
//! - [`llm`] - LLM client implementations
//! - [`rag`] - Loading, chunking, embedding, ingestion and answering
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration and retry helpers

#![cfg_attr(docsrs, feature(doc_cfg))]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Vector index clients.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, documents, errors).
pub mod types;
/// Configuration and retry utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{InMemoryVectorStore, PineconeStore, VectorStore};
pub use llm::{LLMClient, Provider};
pub use rag::{PipelineConfig, PromptTemplate, RagAnswer, RagPipeline};
pub use types::{AppError, Result};
pub use utils::toml_config::AppConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Question-answering pipeline with its injected collaborators
    pub pipeline: Arc<RagPipeline>,
}
