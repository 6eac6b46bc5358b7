//! Console configuration
//!
//! API endpoints, cache timing, UI delays and logging, read from a TOML
//! file with `APPHUB_*` environment variables taking precedence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_health_url")]
    pub health_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://apphub-seven.vercel.app/api/v1".to_string()
}

fn default_health_url() -> String {
    "https://apphub-seven.vercel.app/health".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            health_url: default_health_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Query cache defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_stale_time")]
    pub stale_time_secs: u64,

    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_stale_time() -> u64 {
    300 // 5 minutes
}

fn default_read_retries() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: default_stale_time(),
            read_retries: default_read_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

/// Presentation behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    /// Delay between a success alert and the follow-up navigation
    #[serde(default = "default_navigate_delay")]
    pub navigate_delay_ms: u64,

    #[serde(default = "default_alert_dismiss")]
    pub alert_dismiss_ms: u64,

    #[serde(default = "default_list_page_size")]
    pub logs_page_size: u32,

    #[serde(default = "default_list_page_size")]
    pub tasks_page_size: u32,

    #[serde(default = "default_reviews_page_size")]
    pub reviews_page_size: u32,

    /// Trailing window for analytics and trends
    #[serde(default = "default_analytics_days")]
    pub analytics_days: u32,
}

fn default_navigate_delay() -> u64 {
    3000
}

fn default_alert_dismiss() -> u64 {
    5000
}

fn default_list_page_size() -> u32 {
    50
}

fn default_reviews_page_size() -> u32 {
    20
}

fn default_analytics_days() -> u32 {
    7
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            navigate_delay_ms: default_navigate_delay(),
            alert_dismiss_ms: default_alert_dismiss(),
            logs_page_size: default_list_page_size(),
            tasks_page_size: default_list_page_size(),
            reviews_page_size: default_reviews_page_size(),
            analytics_days: default_analytics_days(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in default_config_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// An explicitly requested file must load; otherwise search the defaults
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `APPHUB_*` overrides from `lookup`; unparsable numbers are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("APPHUB_API_URL") {
            self.api.base_url = url;
        }
        if let Some(url) = lookup("APPHUB_HEALTH_URL") {
            self.api.health_url = url;
        }
        if let Some(secs) = lookup("APPHUB_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.api.request_timeout_secs = secs;
        }
        if let Some(secs) = lookup("APPHUB_STALE_SECS").and_then(|v| v.parse().ok()) {
            self.cache.stale_time_secs = secs;
        }
        if let Some(level) = lookup("APPHUB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("APPHUB_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Config files searched by [`Config::load_default`], in order
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("apphub").join("config.toml"));
    }
    paths.push(PathBuf::from("./apphub.toml"));
    paths
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# AppHub Console Configuration
#
# Environment variables override these settings:
# - APPHUB_API_URL
# - APPHUB_HEALTH_URL
# - APPHUB_TIMEOUT_SECS
# - APPHUB_STALE_SECS
# - APPHUB_LOG_LEVEL
# - APPHUB_LOG_FORMAT

[api]
# Versioned REST API root
base_url = "https://apphub-seven.vercel.app/api/v1"

# Health endpoint (outside the versioned prefix)
health_url = "https://apphub-seven.vercel.app/health"

# Per-request timeout (seconds)
request_timeout_secs = 30

[cache]
# How long a read is served from cache before refetching (seconds)
stale_time_secs = 300

# Extra attempts after a network or server error
read_retries = 1

# Pause between attempts (ms)
retry_delay_ms = 1000

[ui]
# Delay between a success message and navigation (ms)
navigate_delay_ms = 3000

# How long alerts stay visible (ms)
alert_dismiss_ms = 5000

# Rows per page
logs_page_size = 50
tasks_page_size = 50
reviews_page_size = 20

# Trailing window for analytics and trends (days)
analytics_days = 7

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty, json
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.api.base_url, default_base_url());
        assert_eq!(config.cache.stale_time_secs, 300);
        assert_eq!(config.ui.navigate_delay_ms, 3000);
        assert_eq!(config.ui.reviews_page_size, 20);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://localhost:4000/api/v1\"\n\n[ui]\nlogs_page_size = 25").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:4000/api/v1");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.ui.logs_page_size, 25);
        assert_eq!(config.ui.tasks_page_size, 50);
        assert_eq!(config.cache.read_retries, 1);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nstale_time_secs = \"soon\"").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::resolve(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("APPHUB_API_URL", "http://127.0.0.1:9/api/v1"),
            ("APPHUB_TIMEOUT_SECS", "5"),
            ("APPHUB_STALE_SECS", "not-a-number"),
            ("APPHUB_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://127.0.0.1:9/api/v1");
        assert_eq!(config.api.request_timeout_secs, 5);
        assert_eq!(config.cache.stale_time_secs, 300);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.ui.alert_dismiss_ms, 5000);
    }
}
