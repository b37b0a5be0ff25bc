use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::kernel::PipelineSettings;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL; `None` runs against the in-memory store
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub allowed_origins: Vec<String>,
    pub operation_timeout_ms: u64,
    pub bulk_concurrency: usize,
    pub subscriber_buffer: usize,
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_hour: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            port: parse_or("PORT", 8080)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER")
                .unwrap_or_else(|_| "exception-collector".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            operation_timeout_ms: parse_or("OPERATION_TIMEOUT_MS", 5000)?,
            bulk_concurrency: parse_or("BULK_CONCURRENCY", 8)?,
            subscriber_buffer: parse_or("SUBSCRIBER_BUFFER", 256)?,
            rate_limit_per_minute: parse_or("RATE_LIMIT_PER_MINUTE", 30)?,
            rate_limit_per_hour: parse_or("RATE_LIMIT_PER_HOUR", 500)?,
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
            bulk_concurrency: self.bulk_concurrency.max(1),
            ..PipelineSettings::default()
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}
