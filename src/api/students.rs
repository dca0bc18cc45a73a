//! Roster API endpoints.

use axum::extract::{Path, State};

use super::{error, success, ApiResult};
use crate::models::User;
use crate::AppState;

/// GET /api/students - List everyone registered.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = state.roster.list().await;
    success(users, state.revision().await)
}

/// DELETE /api/students/:id - Remove a student.
pub async fn remove_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let revision_id = state.revision().await;

    match state.roster.remove_student(&id).await {
        Ok(user) => success(user, state.revision().await),
        Err(e) => error(e, revision_id),
    }
}
