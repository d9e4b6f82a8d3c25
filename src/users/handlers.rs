use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    error::ApiError,
    extractors::{AppJson, AppPath},
    state::AppState,
    users::{
        dto::{LoginRequest, PublicUser, StatsResponse},
        repo_types::NewUser,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user))
        .route("/users/by-username/:username", get(get_user_by_username))
        .route("/stats", get(stats))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(mut payload): AppJson<NewUser>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    let user = state.users.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<PublicUser>, ApiError> {
    state
        .users
        .get_user(id)
        .await?
        .map(|u| Json(u.into()))
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

#[instrument(skip(state))]
pub async fn get_user_by_username(
    State(state): State<AppState>,
    AppPath(username): AppPath<String>,
) -> Result<Json<PublicUser>, ApiError> {
    state
        .users
        .get_user_by_username(&username)
        .await?
        .map(|u| Json(u.into()))
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .users
        .authenticate(payload.username.trim(), &payload.password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let total_users = state.users.count_users().await?;
    Ok(Json(StatsResponse { total_users }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use crate::cleanup::services::fake::FakeCleanup;
    use crate::users::repo::memory::InMemoryUserStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        build_app(AppState::fake(
            Arc::new(InMemoryUserStore::default()),
            Arc::new(FakeCleanup::succeeding(json!({}))),
        ))
    }

    async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn ada() -> Value {
        json!({
            "username": "ada",
            "password": "analytical-engine",
            "full_name": "Ada Lovelace",
            "email": "Ada@Example.com",
            "role": "admin"
        })
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example.com"));
    }

    #[tokio::test]
    async fn create_then_fetch_user() {
        let app = app();

        let (status, created) = send(&app, post_json("/api/users", ada())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["role"], "user");
        assert_eq!(created["email"], "ada@example.com");
        assert!(created.get("password_hash").is_none());

        let id = created["id"].as_i64().unwrap();
        let (status, by_id) = send(&app, get(&format!("/api/users/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_id["username"], "ada");

        let (status, by_name) = send(&app, get("/api/users/by-username/ada")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_name["id"], id);

        let (status, stats) = send(&app, get("/api/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_users"], 1);
    }

    #[tokio::test]
    async fn unknown_user_is_404() {
        let app = app();
        let (status, body) = send(&app, get("/api/users/by-username/nonexistent")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "User not found" }));
    }

    #[tokio::test]
    async fn duplicate_username_is_409() {
        let app = app();
        send(&app, post_json("/api/users", ada())).await;
        let (status, _) = send(&app, post_json("/api/users", ada())).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn non_numeric_id_is_json_400() {
        let (status, body) = send(&app(), get("/api/users/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("abc"));
    }

    #[tokio::test]
    async fn malformed_body_is_json_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/users")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_fields_are_json_error() {
        let (status, body) = send(
            &app(),
            post_json("/api/auth/login", json!({ "username": "ada" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].as_str().unwrap().contains("password"));
    }

    #[tokio::test]
    async fn rejects_short_password() {
        let mut body = ada();
        body["password"] = json!("short");
        let (status, body) = send(&app(), post_json("/api/users", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Password too short");
    }

    #[tokio::test]
    async fn login_accepts_right_password_only() {
        let app = app();
        send(&app, post_json("/api/users", ada())).await;

        let (status, user) = send(
            &app,
            post_json("/api/auth/login", json!({ "username": "ada", "password": "analytical-engine" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["username"], "ada");

        let (status, body) = send(
            &app,
            post_json("/api/auth/login", json!({ "username": "ada", "password": "difference-engine" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn store_failure_is_500() {
        let app = build_app(AppState::fake(
            Arc::new(InMemoryUserStore::failing()),
            Arc::new(FakeCleanup::succeeding(json!({}))),
        ));
        let (status, body) = send(&app, get("/api/users/1")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["message"].as_str().unwrap().contains("connection refused"));
    }
}
