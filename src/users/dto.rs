use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::repo_types::User;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            full_name: u.full_name,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

/// Counts behind the dashboard status cards.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_users: i64,
}
