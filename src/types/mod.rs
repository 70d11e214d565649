use serde::{Deserialize, Serialize};

// ============= API Request/Response Types =============

/// Form payload accepted by `/get`, from the query string (GET) or an
/// urlencoded body (POST).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatForm {
    pub msg: Option<String>,
}

// ============= RAG Types =============

/// Raw text of one loaded source unit (a PDF page or a whole text file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub content: String,
    pub source: String,
    /// 0-based page number for paginated sources.
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: Option<u32>,
    /// Position of the chunk within its loaded document.
    pub chunk_index: usize,
}

/// A bounded span of source text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A persisted entry in the index store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Similarity score reported by the store (higher is closer).
    pub score: f32,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether retrying the failed call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Unavailable(_))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::VectorStore(_) | AppError::Embedding(_) | AppError::LLM(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Io(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::InvalidInput("msg".into()), StatusCode::BAD_REQUEST)]
    #[case(AppError::NotFound("index".into()), StatusCode::NOT_FOUND)]
    #[case(AppError::Unavailable("429".into()), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(AppError::LLM("bad".into()), StatusCode::BAD_GATEWAY)]
    #[case(AppError::Configuration("dim".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status_mapping(#[case] err: AppError, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(AppError::Unavailable("timeout".into()).is_transient());
        assert!(!AppError::VectorStore("bad request".into()).is_transient());
        assert!(!AppError::InvalidInput("empty".into()).is_transient());
    }
}
