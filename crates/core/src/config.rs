//! Application configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `SHELFRANK_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Directory name used under the platform config and cache roots.
pub const APP_DIR: &str = "shelfrank";

const CONFIG_FILE: &str = "config.toml";

const DEFAULT_CONFIG: &str = r#"# shelfrank configuration

# Base URL of the catalog XML API.
api_base = "https://boardgamegeek.com/xmlapi2/"

# Live attempts per request before giving up.
retry_budget = 5

# Pause between attempts, in milliseconds.
retry_delay_ms = 0

# Body text the service uses to signal throttling.
rate_limit_marker = "try again later"

request_timeout_secs = 30

# Response cache. A TTL of 0 keeps entries forever.
cache_enabled = true
cache_ttl_hours = 12
"#;

/// Runtime settings for the catalog client and cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL that request paths are joined onto.
    pub api_base: String,
    /// Maximum live attempts per request.
    pub retry_budget: u32,
    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// Case-insensitive body marker that means "throttled, retry".
    pub rate_limit_marker: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Whether the response cache is consulted and populated.
    pub cache_enabled: bool,
    /// Location of the persisted response cache.
    pub cache_path: PathBuf,
    /// Cache entry lifetime in hours; 0 disables expiry.
    pub cache_ttl_hours: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: "https://boardgamegeek.com/xmlapi2/".to_string(),
            retry_budget: 5,
            retry_delay_ms: 0,
            rate_limit_marker: "try again later".to_string(),
            request_timeout_secs: 30,
            user_agent: format!("shelfrank/{}", env!("CARGO_PKG_VERSION")),
            cache_enabled: true,
            cache_path: cache_root().join("responses.json"),
            cache_ttl_hours: 12,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path`, which may be absent.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).required(false))
            .add_source(config::Environment::with_prefix("SHELFRANK"))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.retry_budget = config.retry_budget.max(1);
        Ok(config)
    }

    /// Pause between retry attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Cache entry lifetime, `None` when entries never expire.
    pub fn cache_ttl(&self) -> Option<chrono::Duration> {
        match self.cache_ttl_hours {
            0 => None,
            hours => Some(chrono::Duration::hours(hours as i64)),
        }
    }
}

/// Default configuration file path.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Root directory for cached responses and logs.
pub fn cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write the commented default configuration if no file exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.retry_budget, 5);
        assert_eq!(config.retry_delay(), Duration::ZERO);
        assert_eq!(config.rate_limit_marker, "try again later");
        assert!(config.cache_enabled);
        Ok(())
    }

    #[test]
    fn file_overrides_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "retry_budget = 0\ncache_ttl_hours = 0\napi_base = \"http://localhost:9/api/\"\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.retry_budget, 1, "budget is clamped to one attempt");
        assert_eq!(config.cache_ttl(), None);
        assert_eq!(config.api_base, "http://localhost:9/api/");
        assert_eq!(config.request_timeout_secs, 30);
        Ok(())
    }

    #[test]
    fn default_file_parses_back() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path)?;
        assert!(path.is_file());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.retry_budget, 5);
        assert_eq!(config.cache_ttl(), Some(chrono::Duration::hours(12)));
        Ok(())
    }
}
