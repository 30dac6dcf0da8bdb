use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub schema_path: String,
    pub bind_addr: SocketAddr,
    pub max_workers: usize,
    pub cache_ttl: Duration,
    /// Scraper output files; each file's stem names its source.
    pub raw_data_files: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/cars.sqlite3".to_string()),
            schema_path: env::var("SCHEMA_PATH").unwrap_or_else(|_| "sql/schema.sql".to_string()),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("BIND_ADDR must be a socket address")?,
            max_workers: env::var("MAX_WORKERS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .context("MAX_WORKERS must be a valid number")?,
            cache_ttl: Duration::from_secs(
                env::var("CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .context("CACHE_TTL_SECS must be a valid number")?,
            ),
            raw_data_files: parse_file_list(
                &env::var("RAW_DATA_FILES").unwrap_or_else(|_| {
                    "data/raw/polovni_automobili.json,data/raw/mobile_de.json".to_string()
                }),
            ),
        })
    }
}

fn parse_file_list(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
