//! Daemon configuration from `KEYGATE_*` environment variables

use anyhow::{anyhow, bail, Context, Result};
use keygate_core::application::constants::{
    DEFAULT_DAILY_QUOTA, DEFAULT_REQUIRED_ENGINE_VERSION, DEFAULT_SYNC_INTERVAL,
};
use keygate_core::domain::EngineVersion;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_INBOX_DIR: &str = "~/.keygate/inbox";
const DEFAULT_SPOOL_DIR: &str = "~/.keygate/engine/spool";
const DEFAULT_ENGINE_VERSION_FILE: &str = "~/.keygate/engine/version";
const DEFAULT_KEY_FILE_EXTENSION: &str = "zip";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Development: pretty formatting with colors
    Pretty,
    /// Production: JSON structured logging
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub inbox_dir: PathBuf,
    pub spool_dir: PathBuf,
    pub engine_version_file: PathBuf,
    pub key_file_extension: String,
    pub sync_interval: Duration,
    pub daily_quota: u32,
    pub min_engine_version: EngineVersion,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str, default: &str| -> PathBuf {
            let raw = lookup(key).unwrap_or_else(|| default.to_string());
            PathBuf::from(shellexpand::tilde(&raw).into_owned())
        };

        let sync_interval = match lookup("KEYGATE_SYNC_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("KEYGATE_SYNC_INTERVAL_SECS='{}'", raw))?;
                if secs == 0 {
                    bail!("KEYGATE_SYNC_INTERVAL_SECS must be greater than 0");
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_SYNC_INTERVAL,
        };

        let daily_quota = match lookup("KEYGATE_DAILY_QUOTA") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("KEYGATE_DAILY_QUOTA='{}'", raw))?,
            None => DEFAULT_DAILY_QUOTA,
        };

        let min_engine_version = match lookup("KEYGATE_MIN_ENGINE_VERSION") {
            Some(raw) => raw
                .parse::<EngineVersion>()
                .with_context(|| format!("KEYGATE_MIN_ENGINE_VERSION='{}'", raw))?,
            None => DEFAULT_REQUIRED_ENGINE_VERSION,
        };

        // Accept "zip", ".zip" or " zip "; the source compares bare extensions
        let key_file_extension = match lookup("KEYGATE_KEY_FILE_EXTENSION") {
            Some(raw) => {
                let ext = raw.trim().trim_start_matches('.');
                if ext.is_empty() {
                    bail!("KEYGATE_KEY_FILE_EXTENSION must not be empty");
                }
                ext.to_string()
            }
            None => DEFAULT_KEY_FILE_EXTENSION.to_string(),
        };

        let log_format = match lookup("KEYGATE_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::Pretty,
        };

        Ok(Self {
            inbox_dir: path("KEYGATE_INBOX_DIR", DEFAULT_INBOX_DIR),
            spool_dir: path("KEYGATE_SPOOL_DIR", DEFAULT_SPOOL_DIR),
            engine_version_file: path("KEYGATE_ENGINE_VERSION_FILE", DEFAULT_ENGINE_VERSION_FILE),
            key_file_extension,
            sync_interval,
            daily_quota,
            min_engine_version,
            log_format,
        })
    }
}
