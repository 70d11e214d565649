//! LLM Provider Clients and Abstractions
//!
//! - [`LLMClient`] - The core trait the answer generator depends on
//! - [`Provider`] - Runtime provider selection, built from the `[llm]` config
//! - [`openai::OpenAIClient`] - OpenAI-compatible chat completions (Groq)
//!
//! # Example
//!
//! ```ignore
//! use medrag::llm::Provider;
//!
//! let client = Provider::from_config(&config)?.create_client()?;
//! let answer = client
//!     .generate_with_system("You are a medical assistant.", "What does aspirin do?")
//!     .await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// OpenAI-compatible chat-completions client.
pub mod openai;

pub use client::{GenerationOptions, LLMClient, Provider};
