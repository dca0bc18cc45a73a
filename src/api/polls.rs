//! Poll API endpoints.

use axum::extract::{Path, State};

use super::{created, error, success, ApiJson, ApiResult};
use crate::models::{CreatePollRequest, Poll, PollResults, UpdatePollRequest};
use crate::AppState;

/// GET /api/polls - List all polls.
pub async fn list_polls(State(state): State<AppState>) -> ApiResult<Vec<Poll>> {
    let polls = state.polls.list().await;
    success(polls, state.revision().await)
}

/// GET /api/polls/:id - Get a single poll.
pub async fn get_poll(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Poll> {
    let revision_id = state.revision().await;

    match state.polls.get(&id).await {
        Ok(poll) => success(poll, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/polls - Create a new poll.
pub async fn create_poll(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreatePollRequest>,
) -> ApiResult<Poll> {
    let revision_id = state.revision().await;

    match state.polls.create(&request).await {
        Ok(poll) => created(poll, state.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/polls/:id - Update fields and/or status of a poll.
pub async fn update_poll(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdatePollRequest>,
) -> ApiResult<Poll> {
    let revision_id = state.revision().await;

    match state.polls.update(&id, &request).await {
        Ok(poll) => success(poll, state.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/polls/:id - Delete a poll.
pub async fn delete_poll(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.revision().await;

    match state.polls.delete(&id).await {
        Ok(()) => success((), state.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/polls/:id/results - Current per-option counts.
pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PollResults> {
    let revision_id = state.revision().await;

    match state.polls.results(&id).await {
        Ok(results) => success(results, revision_id),
        Err(e) => error(e, revision_id),
    }
}
