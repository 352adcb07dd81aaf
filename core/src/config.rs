//! Migration configuration loading
//!
//! Loads configuration from `./spacecopy.toml` (or `SPACECOPY_CONFIG` env).
//! The resulting [`MigrationConfig`] is built once at process start and handed
//! to [`crate::Migrator`]; nothing reads configuration from globals.

use crate::error::{MigrateError, Result};
use crate::policy::ConflictMode;
use crate::retry::RetryConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Root configuration for one migration run
#[derive(Debug, Deserialize, Clone)]
pub struct MigrationConfig {
    /// Instance pages are read from
    pub source: InstanceConfig,

    /// Instance pages are written to
    pub destination: InstanceConfig,

    /// Copy binary attachments of every page
    #[serde(default = "default_true")]
    pub copy_attachments: bool,

    /// Copy labels of every page
    #[serde(default = "default_true")]
    pub copy_labels: bool,

    /// What to do when a page with the same title already exists under the
    /// same parent
    #[serde(default)]
    pub on_title_conflict: ConflictMode,

    /// Page size for listing endpoints
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry tuning
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Connection details for one content service instance
#[derive(Deserialize, Clone)]
pub struct InstanceConfig {
    /// Base URL including any context path (e.g. `https://acme.example/wiki`)
    pub base_url: String,
    /// Key of the space to read from or write to
    pub space_key: String,
    pub username: String,
    #[serde(default)]
    pub api_token: String,
}

impl std::fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("base_url", &self.base_url)
            .field("space_key", &self.space_key)
            .field("username", &self.username)
            .field("api_token", &redact(&self.api_token))
            .finish()
    }
}

/// Display form of an API token: `<unset>` or `<redacted>`
pub fn redact(token: &str) -> &'static str {
    if token.is_empty() { "<unset>" } else { "<redacted>" }
}

fn default_true() -> bool {
    true
}

fn default_page_limit() -> u32 {
    200
}

fn default_timeout_secs() -> u64 {
    60
}

impl InstanceConfig {
    /// Parsed base URL. Validation guarantees this succeeds after loading.
    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| MigrateError::invalid_url(&self.base_url, e))
    }

    fn validate(&self, side: &str) -> Result<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            MigrateError::config_with_source(format!("{side}.base_url is not a valid URL"), e)
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MigrateError::config(format!(
                "{side}.base_url must use http or https, got {}",
                url.scheme()
            )));
        }
        if self.space_key.trim().is_empty() {
            return Err(MigrateError::config(format!("{side}.space_key is empty")));
        }
        if self.username.trim().is_empty() {
            return Err(MigrateError::config(format!("{side}.username is empty")));
        }
        Ok(())
    }
}

impl MigrationConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "SPACECOPY_CONFIG";

    /// Environment variable overriding `source.api_token`
    pub const ENV_SOURCE_TOKEN: &'static str = "SPACECOPY_SOURCE_API_TOKEN";

    /// Environment variable overriding `destination.api_token`
    pub const ENV_DESTINATION_TOKEN: &'static str = "SPACECOPY_DESTINATION_API_TOKEN";

    /// Default config filename, looked up in the working directory
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "spacecopy.toml";

    /// Load configuration from file
    ///
    /// Resolution order:
    /// 1. `explicit` path (the `--config` flag)
    /// 2. `SPACECOPY_CONFIG` environment variable
    /// 3. `./spacecopy.toml`
    ///
    /// Unlike optional tool settings there is no usable default here, so a
    /// missing file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit);
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path, applying token overrides
    /// from the environment
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MigrateError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;

        let mut cfg = Self::parse_unvalidated(&contents)?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        tracing::debug!(path = %path.display(), "loaded migration config");
        Ok(cfg)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg = Self::parse_unvalidated(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn parse_unvalidated(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| MigrateError::config_with_source("failed to parse config", e))
    }

    /// Replace API tokens with values from `lookup` when present and non-empty
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(Self::ENV_SOURCE_TOKEN).filter(|t| !t.is_empty()) {
            self.source.api_token = token;
        }
        if let Some(token) = lookup(Self::ENV_DESTINATION_TOKEN).filter(|t| !t.is_empty()) {
            self.destination.api_token = token;
        }
    }

    fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }
        PathBuf::from(Self::DEFAULT_CONFIG_FILENAME)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.source.validate("source")?;
        self.destination.validate("destination")?;

        if self.page_limit == 0 {
            return Err(MigrateError::config("page_limit must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(MigrateError::config("timeout_secs must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(MigrateError::config("retry.max_attempts must be at least 1"));
        }
        if !self.retry.base_wait_secs.is_finite() || self.retry.base_wait_secs < 0.0 {
            return Err(MigrateError::config(format!(
                "retry.base_wait_secs must be a non-negative number, got {}",
                self.retry.base_wait_secs
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
