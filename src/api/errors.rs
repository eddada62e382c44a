use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::attempts::AttemptError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Gone(String),
    UnprocessableEntity(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::NotFound => ApiError::NotFound("Quiz or attempt not found".to_string()),
            AttemptError::NotEnrolled => ApiError::Forbidden("Not enrolled in this course"),
            AttemptError::Forbidden => ApiError::Forbidden("Access denied"),
            AttemptError::QuizUnavailable(reason) => ApiError::Conflict(reason),
            AttemptError::AlreadySubmitted => {
                ApiError::Conflict("Attempt has already been submitted".to_string())
            }
            AttemptError::AttemptExpired => ApiError::Gone(
                "Attempt time limit has expired; start a new attempt".to_string(),
            ),
            AttemptError::Validation(detail) => ApiError::UnprocessableEntity(detail),
            AttemptError::Store(err) => ApiError::internal(err, "Attempt store failure"),
        }
    }
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let mut response = error_response(StatusCode::UNAUTHORIZED, message.to_string());
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                error_response(StatusCode::FORBIDDEN, message.to_string())
            }
            ApiError::BadRequest(message) => error_response(StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => error_response(StatusCode::CONFLICT, message),
            ApiError::Gone(message) => error_response(StatusCode::GONE, message),
            ApiError::UnprocessableEntity(message) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, message)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::StoreError;

    fn status_of(err: AttemptError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn attempt_errors_map_to_http_statuses() {
        assert_eq!(status_of(AttemptError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AttemptError::NotEnrolled), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AttemptError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(AttemptError::QuizUnavailable("closed".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(AttemptError::AlreadySubmitted), StatusCode::CONFLICT);
        assert_eq!(status_of(AttemptError::AttemptExpired), StatusCode::GONE);
        assert_eq!(
            status_of(AttemptError::Validation("bad".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AttemptError::Store(StoreError::Database(sqlx::Error::PoolTimedOut))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthorized_sets_bearer_challenge() {
        let response = ApiError::Unauthorized("Invalid authentication credentials").into_response();
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
