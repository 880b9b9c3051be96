//! Configuration loading for `ccm`.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. `--config <path>` (CLI flag; must exist)
//! 2. `~/.ccloud-metrics/config.toml` (user)
//! 3. `/etc/ccloud-metrics/config.toml` (system)
//! 4. built-in defaults
//!
//! Credentials come from `CCLOUD_API_KEY` / `CCLOUD_API_SECRET` or, failing
//! that, `~/.ccloud-metrics/secrets.toml`, which must not be readable by
//! group or other.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::{DEFAULT_BATCH_TIMEOUT, DEFAULT_MAX_WORKERS, DEFAULT_PAGE_LIMIT};
use crate::{MetricsClientBuilder, MetricsError, Result};

const API_KEY_ENV: &str = "CCLOUD_API_KEY";
const API_SECRET_ENV: &str = "CCLOUD_API_SECRET";

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Where to send queries.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_dataset")]
    pub dataset: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            dataset: default_dataset(),
        }
    }
}

fn default_base_url() -> String {
    crate::api::DEFAULT_BASE_URL.to_string()
}

fn default_dataset() -> String {
    crate::api::DEFAULT_DATASET.to_string()
}

/// Query limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent queries per batch (default: 10).
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Points requested per query (default: 1000).
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    /// Batch deadline in seconds (default: 60).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Per-request HTTP timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            page_limit: default_page_limit(),
            timeout_secs: default_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

fn default_timeout() -> u64 {
    DEFAULT_BATCH_TIMEOUT.as_secs()
}

fn default_request_timeout() -> u64 {
    crate::api::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from the standard locations, or defaults if none exist.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MetricsError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MetricsError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(MetricsError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".ccloud-metrics").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/ccloud-metrics/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// A client builder carrying this configuration (credentials not included).
    pub fn builder(&self) -> MetricsClientBuilder {
        MetricsClientBuilder::new()
            .base_url(&self.api.base_url)
            .dataset(&self.api.dataset)
            .max_workers(self.limits.max_workers)
            .page_limit(Some(self.limits.page_limit))
            .default_timeout(Duration::from_secs(self.limits.timeout_secs))
            .request_timeout(Duration::from_secs(self.limits.request_timeout_secs))
    }
}

/// Cloud API credentials.
#[derive(Clone, Deserialize)]
pub struct Secrets {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    /// Load credentials from the environment, then from the user secrets file.
    ///
    /// Returns `None` when neither is present.
    pub fn load() -> Result<Option<Self>> {
        if let (Ok(api_key), Ok(api_secret)) =
            (std::env::var(API_KEY_ENV), std::env::var(API_SECRET_ENV))
        {
            return Ok(Some(Self {
                api_key,
                api_secret,
            }));
        }

        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".ccloud-metrics").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets).map(Some);
            }
        }

        Ok(None)
    }

    /// Load credentials from a TOML file, checking its permissions first.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            MetricsError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MetricsError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            MetricsError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(MetricsError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }
}
