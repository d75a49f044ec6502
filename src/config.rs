//! Runtime configuration read from the environment (and `.env` via dotenvy).

use std::net::IpAddr;

use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub storage: StorageBackend,
    /// Required only for the Postgres backend.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub cookie_secure: bool,
    pub app_base_url: String,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let storage = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid { name: "STORAGE_BACKEND", value: other.to_string() })
            }
        };

        let database_url = lookup("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let host = match lookup("HOST") {
            Some(h) => h.parse().map_err(|_| ConfigError::Invalid { name: "HOST", value: h })?,
            None => IpAddr::from([127, 0, 0, 1]),
        };

        Ok(Self {
            host,
            port: parse_or(&lookup, "PORT", 3000)?,
            storage,
            database_url,
            jwt_secret,
            session_ttl: Duration::hours(parse_or(&lookup, "SESSION_TTL_HOURS", 24 * 7)?),
            reset_token_ttl: Duration::minutes(parse_or(&lookup, "RESET_TOKEN_TTL_MINUTES", 60)?),
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
            app_base_url: lookup("APP_BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
            cors_origin: lookup("CORS_ORIGIN"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}
