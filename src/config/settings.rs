//! Resolved tool configuration.
//!
//! Settings are layered: built-in defaults, then the JSON configuration file
//! (by default `<config dir>/chillhours/config.json`), then the
//! `AMBIENT_API_KEY`, `AMBIENT_APPLICATION_KEY` and `AMBIENT_DEVICE_MAC`
//! environment variables.

use crate::aggregate::hour_bucket::{ChillRange, DEFAULT_CHILL_MAX_F, DEFAULT_CHILL_MIN_F};
use crate::config::error::ConfigError;
use crate::fetch::config::{DEFAULT_MAX_PAGES, DEFAULT_MAX_SPAN_DAYS, DEFAULT_PAGE_SIZE};
use crate::fetch::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::source::ambient_client::DEFAULT_BASE_URL;
use crate::utils::{ensure_dir_exists, get_config_file};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_KEY: &str = "AMBIENT_API_KEY";
pub const ENV_APPLICATION_KEY: &str = "AMBIENT_APPLICATION_KEY";
pub const ENV_DEVICE_MAC: &str = "AMBIENT_DEVICE_MAC";

pub const DEFAULT_SEASON_START_MONTH: u32 = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_key: Option<String>,
    /// Station used when none is given explicitly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_mac: Option<String>,
    pub season_start_month: u32,
    pub chill_min_f: f64,
    pub chill_max_f: f64,
    /// Pause between page requests.
    pub request_delay_ms: u64,
    pub page_size: usize,
    pub max_pages: usize,
    pub max_span_days: i64,
    /// Total attempts per page request, the first one included.
    #[serde(alias = "max_retries")]
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            application_key: None,
            device_mac: None,
            season_start_month: DEFAULT_SEASON_START_MONTH,
            chill_min_f: DEFAULT_CHILL_MIN_F,
            chill_max_f: DEFAULT_CHILL_MAX_F,
            request_delay_ms: 1000,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            max_span_days: DEFAULT_MAX_SPAN_DAYS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: 1000,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Loads the default configuration file and applies environment
    /// overrides. A missing file is not an error.
    pub async fn load() -> Result<Self, ConfigError> {
        let path = get_config_file()?;
        Ok(Self::load_from(&path).await?.with_env_overrides())
    }

    /// Reads settings from `path`, falling back to defaults when it does not
    /// exist. Fields absent from the file keep their defaults.
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No configuration file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Read(path.to_path_buf(), e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    pub async fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = get_config_file()?;
        self.save_to(&path).await?;
        Ok(path)
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir_exists(parent).await?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(ConfigError::Encode)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| ConfigError::Write(path.to_path_buf(), e))?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Overrides credentials and the default device from `lookup`; empty
    /// values are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(application_key) = lookup(ENV_APPLICATION_KEY) {
            self.application_key = Some(application_key);
        }
        if let Some(device_mac) = lookup(ENV_DEVICE_MAC) {
            self.device_mac = Some(device_mac);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=12).contains(&self.season_start_month) {
            return Err(ConfigError::InvalidValue {
                field: "season_start_month",
                message: format!("must be between 1 and 12, got {}", self.season_start_month),
            });
        }
        if self.chill_min_f > self.chill_max_f {
            return Err(ConfigError::InvalidValue {
                field: "chill_min_f",
                message: format!(
                    "{} is above chill_max_f {}",
                    self.chill_min_f, self.chill_max_f
                ),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page_size",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    pub fn chill_range(&self) -> ChillRange {
        ChillRange::new(self.chill_min_f, self.chill_max_f)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}
