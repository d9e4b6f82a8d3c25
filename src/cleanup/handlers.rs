use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use subtle::ConstantTimeEq;
use tracing::{error, info, instrument, warn};

use crate::state::AppState;

pub fn cron_routes() -> Router<AppState> {
    Router::new().route("/cron/cleanup", get(run_cleanup).post(run_cleanup))
}

/// The header must equal `Bearer <secret>` byte for byte.
pub(crate) fn is_authorized(headers: &HeaderMap, secret: &str) -> bool {
    let Some(provided) = headers.get(AUTHORIZATION) else {
        return false;
    };
    let expected = format!("Bearer {}", secret);
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[instrument(skip(state, headers))]
pub async fn run_cleanup(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers, &state.config.cron_secret) {
        warn!("cleanup rejected: bad authorization");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Unauthorized" })),
        )
            .into_response();
    }

    match state.cleanup.run().await {
        Ok(summary) => {
            info!(summary = ?summary, "cleanup completed");
            let mut body = summary;
            body.insert("success".into(), Value::Bool(true));
            body.insert(
                "message".into(),
                Value::String("Cleanup completed successfully".into()),
            );
            (StatusCode::OK, Json(Value::Object(body))).into_response()
        }
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "cleanup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Cleanup failed",
                    "error": message,
                })),
            )
                .into_response()
        }
    }
}
