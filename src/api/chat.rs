//! Chat API endpoints.

use axum::extract::State;

use super::{created, error, success, ApiJson, ApiResult};
use crate::models::{ChatMessage, PostMessageRequest};
use crate::AppState;

/// GET /api/chat - List chat history.
pub async fn list_messages(State(state): State<AppState>) -> ApiResult<Vec<ChatMessage>> {
    let messages = state.chat.list().await;
    success(messages, state.revision().await)
}

/// POST /api/chat - Post a message.
pub async fn post_message(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PostMessageRequest>,
) -> ApiResult<ChatMessage> {
    let revision_id = state.revision().await;

    match state.chat.post(&request).await {
        Ok(message) => created(message, state.revision().await),
        Err(e) => error(e, revision_id),
    }
}
