//! Configuration management for Space Nomad.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `MISSION_STORE` - Optional. `sqlite` (default) or `memory`.
//! - `DATABASE_PATH` - Optional. SQLite file. Defaults to `./space_nomad.db`.
//! - `SPACEX_API_URL` - Optional. Launch list endpoint. Defaults to the public SpaceX v4 API.
//! - `SPACEX_API_KEY` - Optional. Sent as `api_key` to the launch endpoint when set.
//! - `NASA_API_URL` - Optional. APOD endpoint. Defaults to the public NASA API.
//! - `NASA_API_KEY` - Optional. APOD key. Defaults to `DEMO_KEY`.
//! - `UPSTREAM_TIMEOUT_SECS` - Optional. Upstream request timeout. Defaults to `10`.
//! - `SYNC_INTERVAL_SECS` - Optional. Seconds between sync passes. Defaults to `3600`.
//! - `SYNC_ON_STARTUP` - Optional. Run a sync pass at startup. Defaults to `true`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::api::mission_store::MissionStoreType;
use crate::upstream::{DEFAULT_TIMEOUT, NASA_APOD_URL, SPACEX_API_URL};
use crate::util::env_var_bool;

const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Upstream API endpoints and credentials.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// SpaceX launch list endpoint
    pub spacex_url: String,

    /// Optional key for the launch endpoint
    pub spacex_api_key: Option<String>,

    /// NASA Astronomy Picture of the Day endpoint
    pub nasa_url: String,

    pub nasa_api_key: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            spacex_url: SPACEX_API_URL.to_string(),
            spacex_api_key: None,
            nasa_url: NASA_APOD_URL.to_string(),
            nasa_api_key: Some("DEMO_KEY".to_string()),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Synchronizer schedule.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub interval: Duration,
    pub on_startup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SYNC_INTERVAL,
            on_startup: true,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Mission storage backend
    pub store_type: MissionStoreType,

    /// SQLite database file (ignored by the memory backend)
    pub database_path: PathBuf,

    pub upstream: UpstreamConfig,

    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparseable numbers, zero
    /// durations and malformed URLs.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let store_type = std::env::var("MISSION_STORE")
            .map(|s| MissionStoreType::from_str(&s))
            .unwrap_or_default();

        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./space_nomad.db"));

        let defaults = UpstreamConfig::default();
        let upstream = UpstreamConfig {
            spacex_url: validate_url(
                "SPACEX_API_URL",
                std::env::var("SPACEX_API_URL").unwrap_or(defaults.spacex_url),
            )?,
            spacex_api_key: non_empty_var("SPACEX_API_KEY"),
            nasa_url: validate_url(
                "NASA_API_URL",
                std::env::var("NASA_API_URL").unwrap_or(defaults.nasa_url),
            )?,
            nasa_api_key: non_empty_var("NASA_API_KEY").or(defaults.nasa_api_key),
            timeout: duration_secs_var("UPSTREAM_TIMEOUT_SECS", defaults.timeout)?,
        };

        let sync = SyncConfig {
            interval: duration_secs_var("SYNC_INTERVAL_SECS", DEFAULT_SYNC_INTERVAL)?,
            on_startup: env_var_bool("SYNC_ON_STARTUP", true),
        };

        Ok(Self {
            host,
            port,
            store_type,
            database_path,
            upstream,
            sync,
        })
    }

    /// Create a config with custom upstream endpoints (useful for testing).
    ///
    /// Uses the in-memory store and does not sync on startup.
    pub fn new(spacex_url: String, nasa_url: String) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            store_type: MissionStoreType::Memory,
            database_path: PathBuf::from("./space_nomad.db"),
            upstream: UpstreamConfig {
                spacex_url,
                nasa_url,
                ..UpstreamConfig::default()
            },
            sync: SyncConfig {
                on_startup: false,
                ..SyncConfig::default()
            },
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_url(name: &str, value: String) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(&value)
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    Ok(value)
}

fn duration_secs_var(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(default);
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
