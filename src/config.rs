use crate::constants::{API_TOKEN_ENV, API_URL_ENV, CONFIG_PATH_ENV, CSV_MIME_TYPE, DEFAULT_CONFIG_PATH, MAX_UPLOAD_BYTES};
use crate::error::{Result, UploadError};
use crate::parser::UploadLimits;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub allowed_mime: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            allowed_mime: vec![CSV_MIME_TYPE.to_string()],
        }
    }
}

impl Config {
    /// Load from `path`, or from `MARK_UPLOADER_CONFIG` / `config.toml`, then
    /// apply environment overrides. A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| {
            std::env::var(CONFIG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
        });
        let config = Self::load_from(&path)?;
        Ok(config.with_api_url(std::env::var(API_URL_ENV).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(path).map_err(|e| {
            UploadError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&config_content)?;
        config.check()?;
        Ok(config)
    }

    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
        self
    }

    fn check(&self) -> Result<()> {
        if self.upload.max_bytes == 0 {
            return Err(UploadError::Config("upload.max_bytes must be greater than zero".into()));
        }
        if self.upload.allowed_mime.is_empty() {
            return Err(UploadError::Config("upload.allowed_mime must not be empty".into()));
        }
        Ok(())
    }

    pub fn limits(&self) -> UploadLimits {
        UploadLimits {
            max_bytes: self.upload.max_bytes,
            allowed_mime: self.upload.allowed_mime.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }
}

/// Bearer token: the explicit value if given, else `MARK_API_TOKEN`.
/// Never read from the config file.
pub fn api_token(explicit: Option<String>) -> Option<String> {
    explicit
        .or_else(|| std::env::var(API_TOKEN_ENV).ok())
        .filter(|t| !t.trim().is_empty())
}
