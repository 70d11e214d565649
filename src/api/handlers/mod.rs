//! API request handlers.

/// Chat page, question answering and health handlers.
pub mod chat;
