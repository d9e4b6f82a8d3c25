use crate::cleanup::services::{CleanupRunner, PgCleanupRunner};
use crate::config::AppConfig;
use crate::users::{
    password::CredentialHasher,
    repo::{PgUserStore, UserRepository},
    repo_types::UserStore,
};
use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::{str::FromStr, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserRepository,
    pub cleanup: Arc<dyn CleanupRunner>,
}

impl AppState {
    /// Connects to the store once and wires every collaborator from that pool.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, PgPool)> {
        let db = connect(&config).await?;
        let store = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let cleanup = Arc::new(PgCleanupRunner::new(db.clone())) as Arc<dyn CleanupRunner>;
        Ok((Self::from_parts(Arc::new(config), store, cleanup), db))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn UserStore>,
        cleanup: Arc<dyn CleanupRunner>,
    ) -> Self {
        Self {
            config,
            users: UserRepository::new(store, CredentialHasher::new()),
            cleanup,
        }
    }

    #[cfg(test)]
    pub fn fake(store: Arc<dyn UserStore>, cleanup: Arc<dyn CleanupRunner>) -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: crate::config::StoreConfig {
                url: "postgres://postgres@localhost:5432/postgres".into(),
                access_key: "test".into(),
                max_connections: 1,
            },
            cron_secret: "test-cron-secret".into(),
        });
        Self::from_parts(config, store, cleanup)
    }
}

/// The access key is applied as the connection password on top of the URL.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let options = PgConnectOptions::from_str(&config.store.url)
        .context("parse DATABASE_URL")?
        .password(&config.store.access_key);
    let db = PgPoolOptions::new()
        .max_connections(config.store.max_connections)
        .connect_with(options)
        .await
        .context("connect to database")?;
    Ok(db)
}
