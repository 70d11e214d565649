//! HTTP API Handlers and Routes
//!
//! The HTTP layer for medrag, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `GET|POST /` - Chat page (HTML)
//! - `GET|POST /get` - Answer the question in form field `msg`, returns plain text
//! - `GET /health` - Health check endpoint
//!
//! Errors are returned as JSON:
//! ```text
//! {"error": "Invalid input: form field 'msg' is required"}
//! ```

/// Request handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
