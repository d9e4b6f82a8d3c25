use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::users::repo_types::RepoError;

/// Errors returned by HTTP handlers; rendered as `{"message": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Path(#[from] PathRejection),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Json(e) => {
                tracing::warn!(error = %e, "json body rejected");
                (e.status(), e.body_text())
            }
            ApiError::Path(e) => {
                tracing::warn!(error = %e, "path rejected");
                (e.status(), e.body_text())
            }
            ApiError::Repo(RepoError::Duplicate(username)) => (
                StatusCode::CONFLICT,
                format!("Username '{}' is already taken", username),
            ),
            ApiError::Repo(err) => {
                tracing::error!(error = %err, "repository failure");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
