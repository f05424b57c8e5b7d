//! Runtime configuration read from the process environment.
//!
//! `main` loads `.env` through `dotenvy` before calling [`Config::from_env`],
//! so every variable can also live in a dotenv file next to the binary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MODEL_URL: &str =
    "https://router.huggingface.co/hf-inference/models/wambugu71/crop_leaf_diseases_vit";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_RETRIES: u32 = 0;
const DEFAULT_BACKOFF_MS: u64 = 250;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_MB: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("HF_TOKEN environment variable not set")]
    MissingToken,
    #[error("{key} must be a valid number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Settings for the outbound call to the hosted model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub url: String,
    pub token: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

/// Where uploads are staged and how large they may get.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub model: ModelConfig,
    pub uploads: UploadSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = get("HF_TOKEN").ok_or(ConfigError::MissingToken)?;
        let max_upload_mb: usize = parse_or(&get, "MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)?;

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            model: ModelConfig {
                url: get("MODEL_URL").unwrap_or_else(|| DEFAULT_MODEL_URL.to_string()),
                token,
                timeout: Duration::from_secs(parse_or(
                    &get,
                    "MODEL_TIMEOUT_SECS",
                    DEFAULT_TIMEOUT_SECS,
                )?),
                max_retries: parse_or(&get, "MODEL_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
                backoff: Duration::from_millis(parse_or(
                    &get,
                    "MODEL_RETRY_BACKOFF_MS",
                    DEFAULT_BACKOFF_MS,
                )?),
            },
            uploads: UploadSettings {
                dir: get("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
                max_bytes: max_upload_mb * 1024 * 1024,
            },
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = Config::from_lookup(lookup(&[("HF_TOKEN", "hf_test")])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.model.url, DEFAULT_MODEL_URL);
        assert_eq!(config.model.token, "hf_test");
        assert_eq!(config.model.timeout, Duration::from_secs(15));
        assert_eq!(config.model.max_retries, 0);
        assert_eq!(config.uploads.dir, PathBuf::from("uploads"));
        assert_eq!(config.uploads.max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[("HF_TOKEN", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("HF_TOKEN", "hf_test"),
            ("PORT", "8080"),
            ("MODEL_URL", "http://127.0.0.1:9000/model"),
            ("MODEL_TIMEOUT_SECS", "3"),
            ("MODEL_MAX_RETRIES", "2"),
            ("MODEL_RETRY_BACKOFF_MS", "50"),
            ("UPLOAD_DIR", "/tmp/leaves"),
            ("MAX_UPLOAD_MB", "1"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.model.url, "http://127.0.0.1:9000/model");
        assert_eq!(config.model.timeout, Duration::from_secs(3));
        assert_eq!(config.model.max_retries, 2);
        assert_eq!(config.model.backoff, Duration::from_millis(50));
        assert_eq!(config.uploads.dir, PathBuf::from("/tmp/leaves"));
        assert_eq!(config.uploads.max_bytes, 1024 * 1024);
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("HF_TOKEN", "t"), ("PORT", "http")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "PORT",
                value: "http".to_string()
            }
        );
    }
}
