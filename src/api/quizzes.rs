use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::attempt::StartAttemptResponse;
use crate::schemas::quiz::LearnerQuizResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:quiz_id", get(get_quiz))
        .route("/:quiz_id/attempts", post(start_attempt))
}

async fn get_quiz(
    Path(quiz_id): Path<String>,
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<LearnerQuizResponse>, ApiError> {
    let response = state.engine().quiz_for_learner(&quiz_id, &caller).await?;
    Ok(Json(response))
}

async fn start_attempt(
    Path(quiz_id): Path<String>,
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StartAttemptResponse>), ApiError> {
    let response = state.engine().start_attempt(&quiz_id, &caller).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
