//! Process configuration, loaded once at startup from the environment and
//! passed by reference from there on — no process-wide singleton.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string for the relational store. Stubbed by
    /// [`crate::repository::Repository`] in this reimplementation; kept so
    /// the shape matches what a real deployment would supply.
    pub database_url: String,
    pub cache_url: Option<String>,
    /// Required — a missing secret is a startup-time `ConfigError::Missing`
    /// rather than a silently-unsigned token later.
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub access_token_ttl_minutes: u32,
    pub refresh_token_ttl_days: u32,
    pub file_storage_path: Option<String>,
    pub encryption_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub rust_log: String,
    pub log_format: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "memory://in-process".to_string());
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let access_token_ttl_minutes = parse_env_or("ACCESS_TOKEN_TTL_MINUTES", 15)?;
        let refresh_token_ttl_days = parse_env_or("REFRESH_TOKEN_TTL_DAYS", 30)?;
        let port = parse_env_or("PORT", 8082)?;

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(Config {
            database_url,
            cache_url: std::env::var("CACHE_URL").ok(),
            jwt_secret,
            jwt_algorithm: std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
            access_token_ttl_minutes,
            refresh_token_ttl_days,
            file_storage_path: std::env::var("FILE_STORAGE_PATH").ok(),
            encryption_key: std::env::var("ENCRYPTION_KEY").ok(),
            cors_origins,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            port,
        })
    }
}

fn parse_env_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
