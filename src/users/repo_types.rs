use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Role every account is created with.
pub const DEFAULT_ROLE: &str = "user";

/// User record in the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                      // assigned by the store
    pub username: String,             // unique
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
    pub full_name: String,
    pub email: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,   // assigned by the store
}

/// Caller input for account creation. `role` is accepted but ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Row handed to the store on insert; the password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("data error: {0}")]
    Data(String),

    #[error("username already exists: {0}")]
    Duplicate(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Data(err.to_string())
    }
}

/// Persistence seam for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>>;

    /// Inserts one row and returns it as stored, or `None` if the store returned nothing.
    async fn insert(&self, record: UserRecord) -> RepoResult<Option<User>>;

    async fn count(&self) -> RepoResult<i64>;
}
