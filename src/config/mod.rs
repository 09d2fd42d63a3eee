//! Configuration module for the favourites backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration errors reported at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Which repository backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreKind::Sqlite),
            "memory" => Ok(StoreKind::Memory),
            _ => Err(()),
        }
    }
}

/// SQLite file and connection pool bounds.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
}

impl DbConfig {
    /// Default pool settings for the given database file.
    pub fn for_path(path: PathBuf) -> Self {
        Self {
            path,
            max_connections: 25,
            min_connections: 1,
            max_lifetime: Duration::from_secs(300),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Bearer-token settings; see [`crate::auth::AuthGate`] for how they combine.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: Option<String>,
    /// Accept unsigned (`alg: none`) tokens when no secret is set
    pub allow_unsigned_tokens: bool,
}

/// Per-identity request budget. `requests == 0` disables limiting.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 0,
            window: Duration::from_secs(60),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of plain text
    pub log_json: bool,
    pub store: StoreKind,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind_addr = parse_var("FAV_BIND_ADDR", "127.0.0.1:8000")?;
        let log_level = env::var("FAV_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("FAV_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let store = parse_var("FAV_STORE", "sqlite")?;

        let defaults = DbConfig::for_path(
            env::var("FAV_DB_PATH")
                .unwrap_or_else(|_| "./data/favourites.sqlite".to_string())
                .into(),
        );
        let db = DbConfig {
            max_connections: parse_var_or("FAV_DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: parse_var_or("FAV_DB_MIN_CONNECTIONS", defaults.min_connections)?,
            max_lifetime: Duration::from_secs(parse_var_or(
                "FAV_DB_MAX_LIFETIME_SECS",
                defaults.max_lifetime.as_secs(),
            )?),
            idle_timeout: Duration::from_secs(parse_var_or(
                "FAV_DB_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )?),
            ..defaults
        };

        let auth = AuthConfig {
            jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            // Explicit opt-in only
            allow_unsigned_tokens: env::var("ALLOW_UNSIGNED_TOKENS")
                .map(|v| v == "true")
                .unwrap_or(false),
        };

        let rate_limit = RateLimitConfig {
            requests: parse_var("RATE_LIMIT_REQUESTS", "0")?,
            window: Duration::from_secs(parse_var("RATE_LIMIT_WINDOW_SECS", "60")?),
        };

        Ok(Self {
            bind_addr,
            log_level,
            log_json,
            store,
            db,
            auth,
            rate_limit,
        })
    }
}

/// Like [`parse_var`] but falls back to an already-typed default when unset.
fn parse_var_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(var).unwrap_or_else(|_| default.to_string());
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}
