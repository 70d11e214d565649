//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! This module provides the components that turn a directory of medical
//! reference documents into a searchable index, and answer questions from it.
//!
//! # Module Structure
//!
//! - [`rag::loader`](crate::rag::loader) - PDF and plain-text loading
//! - [`rag::chunker`](crate::rag::chunker) - Text chunking for document processing
//! - [`rag::embeddings`](crate::rag::embeddings) - Dense embedding providers
//! - [`rag::prompt`](crate::rag::prompt) - System/user prompt assembly
//! - [`rag::ingest`](crate::rag::ingest) - Batch ingestion into the index
//! - [`rag::pipeline`](crate::rag::pipeline) - Retrieval and answer generation
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are loaded, chunked and embedded
//! 2. **Storage** - Embeddings upserted into the Pinecone index
//! 3. **Retrieval** - Query embedded, top-k similar chunks retrieved
//! 4. **Generation** - LLM answers from the retrieved context
//!
//! # Example
//!
//! ```ignore
//! use medrag::rag::{chunker::TextChunker, embeddings::create_embedder, ingest::Ingestor};
//!
//! let embedder = create_embedder(&config.embedding)?;
//! let chunker = TextChunker::new(500, 20)?;
//! let spec = config.vector_store.index_spec(embedder.dimensions())?;
//!
//! let report = Ingestor::new(embedder, store, chunker, spec)
//!     .run(Path::new("data"))
//!     .await?;
//! ```
//!
//! # Embedding Models
//!
//! The deployment uses `sentence-transformers/all-MiniLM-L6-v2` (384 dimensions),
//! either in-process through fastembed or behind an OpenAI-compatible server.

pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod loader;
pub mod pipeline;
pub mod prompt;

pub use ingest::{IngestReport, Ingestor};
pub use pipeline::{PipelineConfig, RagAnswer, RagPipeline};
pub use prompt::{AssembledPrompt, PromptTemplate};
