//! Configuration management for transcript-harvester
//!
//! Loads configuration from environment variables with sensible defaults.
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub defaults: DefaultSettings,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
    pub lock_wait_ms: u64,
}

/// Values used to seed the singleton `settings` row on first startup.
#[derive(Clone, Debug, Deserialize)]
pub struct DefaultSettings {
    pub max_workers: i32,
    pub max_retries: i32,
    pub backoff_factor: f64,
    pub output_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                host: std::env::var("HARVESTER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("HARVESTER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .unwrap_or(8080),
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            },
            database: DatabaseConfig {
                path: std::env::var("DATABASE_PATH")
                    .unwrap_or_else(|_| "data/app.db".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
                lock_wait_ms: std::env::var("DATABASE_LOCK_WAIT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20_000),
            },
            defaults: DefaultSettings {
                max_workers: std::env::var("DEFAULT_MAX_WORKERS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(4),
                max_retries: std::env::var("DEFAULT_MAX_RETRIES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3),
                backoff_factor: std::env::var("DEFAULT_BACKOFF_FACTOR")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2.0),
                output_dir: std::env::var("DEFAULT_OUTPUT_DIR")
                    .unwrap_or_else(|_| "data/transcripts".to_string()),
            },
        })
    }
}
