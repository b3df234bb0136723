// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::core::retry::RetryPolicy;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    /// Wrap store fetches (GET only) in the backoff helper.
    pub retry_reads: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            retry_reads: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    /// JSON log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Where the persisted session lives.
    pub storage_dir: PathBuf,
    pub freshness_ttl_secs: u64,
    pub request_timeout_secs: Option<u64>,
    pub retry: RetrySettings,
    pub log: LogSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_dir: PathBuf::from("data"),
            freshness_ttl_secs: 300,
            request_timeout_secs: None,
            retry: RetrySettings::default(),
            log: LogSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    local: Option<ClientConfig>,
    production: Option<ClientConfig>,
}

impl ClientConfig {
    /// Load configuration for the current environment, then apply
    /// `JOBBOARD_*` overrides.
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading client configuration for environment: {}", environment);

        let path = std::env::var("JOBBOARD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let config = Self::load_from(&path, &environment)?
            .with_overrides(|key| std::env::var(key).ok());
        config.finish()
    }

    fn get_environment() -> String {
        std::env::var("JOBBOARD_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// A missing file yields the defaults.
    pub fn load_from(path: &Path, environment: &str) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content, environment)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let file: ConfigFile =
            serde_yaml::from_str(content).context("Invalid configuration YAML")?;

        let section = match environment {
            "production" => file.production,
            _ => file.local,
        };
        Ok(section.unwrap_or_default())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("JOBBOARD_API_URL").filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(dir) = lookup("JOBBOARD_STORAGE_DIR").filter(|v| !v.is_empty()) {
            self.storage_dir = PathBuf::from(dir);
        }
        self
    }

    /// Validates the base URL and makes `storage_dir` absolute.
    pub fn finish(mut self) -> Result<Self> {
        reqwest::Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid api_base_url: {}", self.api_base_url))?;

        if !self.storage_dir.is_absolute() {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            self.storage_dir = current_dir.join(&self.storage_dir);
        }
        Ok(self)
    }

    pub fn freshness_ttl(&self) -> Duration {
        Duration::from_secs(self.freshness_ttl_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    /// Policy for store reads, when enabled.
    pub fn read_retry(&self) -> Option<RetryPolicy> {
        self.retry.retry_reads.then(|| self.retry_policy())
    }
}
