//! Session API endpoints.

use axum::extract::State;

use super::{error, success, ApiJson, ApiResult};
use crate::models::{RegisterRequest, RegisteredUser};
use crate::AppState;

/// POST /api/session/register - Join as a student.
pub async fn register_student(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<RegisteredUser> {
    let revision_id = state.revision().await;

    match state.roster.register_student(&request).await {
        Ok(user) => success(RegisteredUser::from(&user), state.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/session/teacher - Join as the teacher.
pub async fn register_teacher(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<RegisteredUser> {
    let revision_id = state.revision().await;

    match state.roster.register_teacher(&request).await {
        Ok(user) => success(RegisteredUser::from(&user), state.revision().await),
        Err(e) => error(e, revision_id),
    }
}
