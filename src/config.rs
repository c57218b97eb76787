// src/config.rs
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Speech-to-text settings used by the captioning client
#[derive(Debug, Clone)]
pub struct CaptionsConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub captions: CaptionsConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup, so tests don't have to touch the process env
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_upload_mb: usize = parse_or(&lookup, "MAX_UPLOAD_MB", 500)?;
        let timeout_secs: u64 = parse_or(&lookup, "CAPTION_TIMEOUT_SECS", 900)?;

        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            upload_dir: non_empty("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            captions: CaptionsConfig {
                api_key: non_empty("CAPTIONS_API_KEY"),
                api_url: non_empty("CAPTIONS_API_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                model: non_empty("CAPTIONS_MODEL").unwrap_or_else(|| "whisper-1".to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key,
                message: format!("'{}' ({})", raw, e),
            })
        }
        _ => {
            tracing::debug!("{} not set, using default", key);
            Ok(default)
        }
    }
}
