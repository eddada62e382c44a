use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::schemas::attempt::{
    AttemptDetailResponse, AttemptResultResponse, AttemptSummary, ListAttemptsQuery,
    SubmitAttemptRequest,
};
use crate::services::scoring::SubmittedAnswer;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attempts))
        .route("/:attempt_id", get(get_attempt))
        .route("/:attempt_id/submit", post(submit_attempt))
}

async fn list_attempts(
    Query(query): Query<ListAttemptsQuery>,
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<AttemptSummary>>, ApiError> {
    let page = state.engine().list_attempts(query, &caller).await?;
    Ok(Json(page))
}

async fn get_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptDetailResponse>, ApiError> {
    let details = state.engine().attempt_details(&attempt_id, &caller).await?;
    Ok(Json(details))
}

async fn submit_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(caller): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let answers = payload
        .answers
        .into_iter()
        .map(|answer| SubmittedAnswer {
            question_id: answer.question_id,
            selected_answer_index: answer.selected_answer_index,
        })
        .collect();

    let result = state.engine().submit_attempt(&attempt_id, &caller, answers).await?;
    Ok(Json(result))
}
