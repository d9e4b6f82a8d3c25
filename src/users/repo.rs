use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use crate::users::password::CredentialHasher;
use crate::users::repo_types::{
    NewUser, RepoError, RepoResult, User, UserRecord, UserStore, DEFAULT_ROLE,
};

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, full_name, email, role, created_at
            FROM users
            WHERE username = $1
            LIMIT 1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, full_name, email, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, record: UserRecord) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, full_name, email, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, password_hash, full_name, email, role, created_at
            "#,
        )
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(&record.full_name)
        .bind(&record.email)
        .bind(&record.role)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(record.username.clone())
            }
            other => RepoError::from(other),
        })?;
        Ok(user)
    }

    async fn count(&self) -> RepoResult<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(total)
    }
}

/// Entry point for every user read and write.
///
/// Store errors from both lookups propagate as [`RepoError::Data`]; `Ok(None)`
/// always means the store answered with no matching row.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>, hasher: CredentialHasher) -> Self {
        Self { store, hasher }
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.store.find_by_username(username).await
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        self.store.find_by_id(id).await
    }

    /// Hashes the password and inserts the user with the default role.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: NewUser) -> RepoResult<User> {
        if let Some(requested) = input.role.as_deref().filter(|r| *r != DEFAULT_ROLE) {
            debug!(requested, "ignoring requested role");
        }

        let password_hash = self
            .hasher
            .hash(&input.password)
            .await
            .map_err(|e| RepoError::Hash(e.to_string()))?;

        let record = UserRecord {
            username: input.username,
            password_hash,
            full_name: input.full_name,
            email: input.email,
            role: DEFAULT_ROLE.to_string(),
        };

        let user = self
            .store
            .insert(record)
            .await?
            .ok_or_else(|| RepoError::Data("insert returned no row".into()))?;

        info!(user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    /// Returns the user only when the password matches its stored hash.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> RepoResult<Option<User>> {
        let Some(user) = self.store.find_by_username(username).await? else {
            warn!("login unknown username");
            return Ok(None);
        };
        if !self.hasher.compare(password, &user.password_hash).await {
            warn!(user_id = user.id, "login invalid password");
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub async fn count_users(&self) -> RepoResult<i64> {
        self.store.count().await
    }
}
