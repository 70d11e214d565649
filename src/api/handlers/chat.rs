use crate::{
    AppState,
    types::{AppError, ChatForm, Result},
};
use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    Form,
};

/// Chat page served at `/`.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../../static/chat.html"))
}

/// Answer the question in form field `msg`.
///
/// GET reads the query string, POST an urlencoded body. The response body is
/// the plain-text answer.
pub async fn chat(
    State(state): State<AppState>,
    form: std::result::Result<Form<ChatForm>, FormRejection>,
) -> Result<String> {
    let Form(form) = form.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let msg = form
        .msg
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("form field 'msg' is required".to_string()))?;

    tracing::debug!(msg_len = msg.len(), "Chat request");
    let answer = state.pipeline.answer(&msg).await?;

    Ok(answer.answer)
}

pub async fn health() -> &'static str {
    "OK"
}
