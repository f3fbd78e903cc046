//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HIRAFI_SW_*)
//! 2. TOML config file (if HIRAFI_SW_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Nested tables use `__` in environment variable names, e.g.
//! `HIRAFI_SW_PARTITIONS__SHELL=hirafi-cache-v3`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Role → partition name table.
///
/// Bumping a name is the migration path: the old partition is deleted at
/// the next activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTable {
    /// Pre-cached app shell.
    pub shell: String,
    /// Assets cached on first use.
    pub runtime: String,
    /// Mirror of successful backend API responses.
    pub api: String,
}

impl Default for PartitionTable {
    fn default() -> Self {
        Self {
            shell: "hirafi-cache-v2".into(),
            runtime: "hirafi-runtime-v1".into(),
            api: "hirafi-api-cache-v1".into(),
        }
    }
}

impl PartitionTable {
    /// Every name that survives activation.
    pub fn current_names(&self) -> Vec<&str> {
        let mut names = vec![self.shell.as_str(), self.runtime.as_str(), self.api.as_str()];
        names.dedup();
        names
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current_names().contains(&name)
    }
}

/// Fallback values for push notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub tag: String,
    /// Destination opened on click, relative to the origin.
    pub url: String,
    pub icon: String,
    pub badge: String,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "حرفي".into(),
            body: "لديك إشعار جديد!".into(),
            tag: "general".into(),
            url: "/".into(),
            icon: "/icons/icon-192x192.png".into(),
            badge: "/icons/icon-192x192.png".into(),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HIRAFI_SW_*)
/// 2. TOML config file (if HIRAFI_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via HIRAFI_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the application is served from; shell paths resolve against it.
    ///
    /// Set via HIRAFI_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Hostname substring identifying the data backend.
    ///
    /// Set via HIRAFI_SW_BACKEND_HOST environment variable.
    #[serde(default = "default_backend_host")]
    pub backend_host: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via HIRAFI_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network stack timeout in milliseconds.
    ///
    /// Set via HIRAFI_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Partition names per role.
    #[serde(default)]
    pub partitions: PartitionTable,

    /// App shell paths pre-cached at install.
    #[serde(default = "default_shell_files")]
    pub shell_files: Vec<String>,

    /// Push notification defaults.
    #[serde(default)]
    pub notification: NotificationDefaults,

    /// Background sync tag that triggers the queued-write flush.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Periodic sync tag that triggers the content refresh.
    #[serde(default = "default_periodic_sync_tag")]
    pub periodic_sync_tag: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./hirafi-sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_backend_host() -> String {
    "supabase.co".into()
}

fn default_user_agent() -> String {
    "hirafi-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_shell_files() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/icons/icon-192x192.png",
        "/icons/icon-512x512.png",
        "/icons/icon-maskable-512x512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_sync_tag() -> String {
    "sync-data".into()
}

fn default_periodic_sync_tag() -> String {
    "update-content".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            backend_host: default_backend_host(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            partitions: PartitionTable::default(),
            shell_files: default_shell_files(),
            notification: NotificationDefaults::default(),
            sync_tag: default_sync_tag(),
            periodic_sync_tag: default_periodic_sync_tag(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HIRAFI_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HIRAFI_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
