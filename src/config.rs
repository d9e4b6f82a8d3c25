use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Connection settings for the managed users store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub access_key: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub cron_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let store = StoreConfig {
            url: required("DATABASE_URL")?,
            access_key: required("DATABASE_ACCESS_KEY")?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", lookup("DATABASE_MAX_CONNECTIONS"), 10)?,
        };
        let cron_secret = required("CRON_SECRET")?;

        Ok(Self {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or("APP_PORT", lookup("APP_PORT"), 8080)?,
            store,
            cron_secret,
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
