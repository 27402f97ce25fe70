//! Client configuration.
//!
//! A [`Config`] is built once and handed to providers at construction. Values
//! come from, in order of precedence: explicit builder calls, environment
//! variables, then an optional TOML file at
//! `<config_dir>/lumiframe/config.toml`.

use crate::error::{GenError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Gemini Developer API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables checked for the credential, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Default delay between video job status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default cap on video job status checks (10 minutes at the default interval).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

/// Resolved client configuration.
#[derive(Clone)]
pub struct Config {
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
    gallery_path: PathBuf,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("gallery_path", &self.gallery_path)
            .finish()
    }
}

impl Config {
    /// Creates a new `ConfigBuilder`.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reads the TOML config file (default location when `path` is `None`)
    /// and returns a builder seeded with its values.
    ///
    /// A missing file is not an error. An unreadable or malformed file is.
    pub fn load(path: Option<&Path>) -> Result<ConfigBuilder> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_config_path);
        let file = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| GenError::Config(format!("failed to read {}: {e}", path.display())))?;
            toml::from_str::<FileConfig>(&content)
                .map_err(|e| GenError::Config(format!("failed to parse {}: {e}", path.display())))?
        } else {
            FileConfig::default()
        };
        Ok(ConfigBuilder::from_file(file))
    }

    /// The API credential.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The API base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Delay between video job status checks.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Maximum number of video job status checks.
    pub fn max_poll_attempts(&self) -> u32 {
        self.max_poll_attempts
    }

    /// Path of the gallery file.
    pub fn gallery_path(&self) -> &Path {
        &self.gallery_path
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    file_api_key: Option<String>,
    base_url: Option<String>,
    poll_interval: Option<Duration>,
    max_poll_attempts: Option<u32>,
    gallery_path: Option<PathBuf>,
}

impl ConfigBuilder {
    fn from_file(file: FileConfig) -> Self {
        Self {
            api_key: None,
            file_api_key: file.api.api_key,
            base_url: file.api.base_url,
            poll_interval: file.video.poll_interval_secs.map(Duration::from_secs),
            max_poll_attempts: file.video.max_poll_attempts,
            gallery_path: file.gallery.path,
        }
    }

    /// Sets the API key. Takes precedence over the environment.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the delay between video job status checks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the maximum number of video job status checks.
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = Some(attempts);
        self
    }

    /// Sets the gallery file path.
    pub fn gallery_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.gallery_path = Some(path.into());
        self
    }

    /// Gallery path this builder would resolve to. Needs no credential.
    pub fn resolved_gallery_path(&self) -> PathBuf {
        self.gallery_path.clone().unwrap_or_else(default_gallery_path)
    }

    /// Builds the config, resolving the credential.
    pub fn build(self) -> Result<Config> {
        let api_key = non_blank(self.api_key)
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .find_map(|var| non_blank(std::env::var(var).ok()))
            })
            .or_else(|| non_blank(self.file_api_key))
            .ok_or_else(|| {
                GenError::MissingCredential(
                    "set GEMINI_API_KEY or GOOGLE_API_KEY, or api_key in the config file".into(),
                )
            })?;

        let max_poll_attempts = self.max_poll_attempts.unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS);
        if max_poll_attempts == 0 {
            return Err(GenError::Config("max_poll_attempts must be at least 1".into()));
        }
        let poll_interval = self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        if poll_interval.is_zero() {
            return Err(GenError::Config("poll interval must be greater than zero".into()));
        }

        Ok(Config {
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            poll_interval,
            max_poll_attempts,
            gallery_path: self.gallery_path.unwrap_or_else(default_gallery_path),
        })
    }
}

/// Blank values count as unset so the next source gets a chance.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    video: VideoSection,
    #[serde(default)]
    gallery: GallerySection,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    api_key: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VideoSection {
    poll_interval_secs: Option<u64>,
    max_poll_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct GallerySection {
    path: Option<PathBuf>,
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lumiframe")
        .join("config.toml")
}

/// Default gallery file location.
pub fn default_gallery_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lumiframe")
        .join("gallery.json")
}
