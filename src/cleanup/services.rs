use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;

/// Key/value summary reported by a cleanup run, merged into the HTTP response.
pub type CleanupSummary = Map<String, Value>;

/// The external cleanup routine. Implementations own all deletion logic.
#[async_trait]
pub trait CleanupRunner: Send + Sync {
    async fn run(&self) -> anyhow::Result<CleanupSummary>;
}

/// Runs the store-side `cleanup_expired_data()` function.
#[derive(Clone)]
pub struct PgCleanupRunner {
    db: PgPool,
}

impl PgCleanupRunner {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CleanupRunner for PgCleanupRunner {
    async fn run(&self) -> anyhow::Result<CleanupSummary> {
        let raw = sqlx::query_scalar::<_, Option<Value>>("SELECT cleanup_expired_data()::jsonb")
            .fetch_one(&self.db)
            .await
            .context("call cleanup_expired_data")?;
        Ok(into_summary(raw.unwrap_or(Value::Null)))
    }
}

pub(crate) fn into_summary(raw: Value) -> CleanupSummary {
    match raw {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("result".into(), other);
            map
        }
    }
}
