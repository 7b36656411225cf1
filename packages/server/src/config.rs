//! Server configuration loaded from environment variables.

use thiserror::Error;

/// Origin allowed when `CORS_ORIGINS` is unset or empty.
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `DATABASE_URL` was not set.
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    /// `PORT` was set but is not a valid port number.
    #[error("PORT must be a valid port number, got {value:?}")]
    InvalidPort {
        /// Raw value received.
        value: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Environment name (e.g. `development`, `production`).
    pub env: String,
    /// Whether debug logging is on by default.
    pub debug: bool,
    /// Bind address.
    pub bind_addr: String,
    /// Bind port.
    pub port: u16,
    /// Database connection URL.
    pub database_url: String,
    /// Origins allowed to make cross-origin requests.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Loads configuration from the process environment.
    ///
    /// | Env Var        | Default                          |
    /// |----------------|----------------------------------|
    /// | `DATABASE_URL` | required                         |
    /// | `BIND_ADDR`    | `127.0.0.1`                      |
    /// | `PORT`         | `5000`                           |
    /// | `CORS_ORIGINS` | `http://localhost:5173`          |
    /// | `APP_ENV`      | `development`                    |
    /// | `APP_DEBUG`    | `true` only in `development`     |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `DATABASE_URL` is missing or `PORT` is
    /// not a valid port.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());
        let debug = parse_bool(lookup("APP_DEBUG").as_deref(), env == "development");

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort { value })?,
            None => 5000,
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let cors_origins = parse_origins(lookup("CORS_ORIGINS").as_deref());

        Ok(Self {
            env,
            debug,
            bind_addr,
            port,
            database_url,
            cors_origins,
        })
    }
}

fn parse_bool(value: Option<&str>, default: bool) -> bool {
    value.map_or(default, |v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        )
    })
}

fn parse_origins(value: Option<&str>) -> Vec<String> {
    match value {
        Some(v) if !v.is_empty() => v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![DEFAULT_CORS_ORIGIN.to_string()],
    }
}
