use crate::AppState;
use crate::api::handlers::chat;
use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Largest accepted request body. Form posts carry a single short question.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(chat::index).post(chat::index))
        .route("/get", get(chat::chat).post(chat::chat))
        .route("/health", get(chat::health))
}

/// Routes plus the middleware stack the server runs with.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
