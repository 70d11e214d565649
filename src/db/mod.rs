//! Index store clients.
//!
//! - [`vectorstore`] - the [`VectorStore`] trait and an in-memory store
//! - [`pinecone`] - Pinecone serverless index over its REST API

pub mod pinecone;
pub mod vectorstore;

// Re-exports
pub use pinecone::{PineconeConfig, PineconeStore};
pub use vectorstore::{
    check_dimension, DistanceMetric, InMemoryVectorStore, IndexSpec, IndexStats, VectorStore,
};
