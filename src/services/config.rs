//! Client configuration (`~/.herdbook/config.json`)
//!
//! Precedence: command-line flags, then `HERDBOOK_API_URL`, then the file,
//! then built-in defaults. A missing file is not an error.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::services::dates::MAX_WINDOW_DAYS;
use crate::services::LactationPolicy;
use crate::types::{HerdbookError, Result};

/// Environment override for the API base URL
pub const API_URL_ENV: &str = "HERDBOOK_API_URL";

/// Default API base URL (local development server)
const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Rows per page in list views
const DEFAULT_PAGE_SIZE: usize = 8;

/// HTTP request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub page_size: usize,
    pub timeout_secs: u64,
    /// Length of the trend window shown by `daily`
    pub trend_days: u32,
    pub lactation: LactationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            trend_days: 7,
            lactation: LactationPolicy::default(),
        }
    }
}

impl Config {
    /// `~/.herdbook`
    pub fn home_dir() -> Result<PathBuf> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| HerdbookError::Config("Cannot determine home directory".into()))?;
        Ok(base_dirs.home_dir().join(".herdbook"))
    }

    /// Load from the default location and apply the environment override
    pub fn load() -> Result<Self> {
        let path = Self::home_dir()?.join("config.json");
        let mut config = Self::load_from(&path)?;
        config.apply_env(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            HerdbookError::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, api_url: Option<String>, page_size: Option<usize>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url;
        }
        if let Some(size) = page_size.filter(|s| *s > 0) {
            self.page_size = size;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(HerdbookError::Config(format!(
                "api_url must start with http:// or https://, got '{}'",
                self.api_url
            )));
        }
        if self.page_size == 0 {
            return Err(HerdbookError::Config("page_size must be positive".into()));
        }
        let windows = [
            ("trend_days", self.trend_days),
            ("lactation.window_days", self.lactation.window_days),
        ];
        for (name, days) in windows {
            if !(1..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(HerdbookError::Config(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_WINDOW_DAYS, days
                )));
            }
        }
        let l = &self.lactation;
        if l.mid_min_liters > l.early_min_liters {
            return Err(HerdbookError::Config(
                "lactation.mid_min_liters cannot exceed lactation.early_min_liters".into(),
            ));
        }
        Ok(())
    }
}
