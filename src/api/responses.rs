//! Response API endpoints, nested under a poll.

use axum::extract::{Path, State};

use super::{created, error, success, ApiJson, ApiResult};
use crate::models::{PollResponse, SubmitResponseRequest};
use crate::AppState;

/// GET /api/polls/:id/responses - List responses for a poll.
pub async fn list_responses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<PollResponse>> {
    let revision_id = state.revision().await;

    match state.responses.list_by_poll(&id).await {
        Ok(responses) => success(responses, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/polls/:id/responses - Submit a student's answer.
pub async fn submit_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<SubmitResponseRequest>,
) -> ApiResult<PollResponse> {
    let revision_id = state.revision().await;

    match state.responses.submit(&id, &request).await {
        Ok(response) => created(response, state.revision().await),
        Err(e) => error(e, revision_id),
    }
}
