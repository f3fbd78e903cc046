//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `backend_host`, `user_agent`, a partition name or `shell_files` is empty
    /// - the api partition shares a name with the shell or runtime partition
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("origin", "must use http or https")),
            Err(e) => return Err(invalid("origin", &format!("not an absolute URL: {e}"))),
        }

        if self.backend_host.trim().is_empty() {
            return Err(invalid("backend_host", "must not be empty"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        let partitions = &self.partitions;
        for (field, name) in [
            ("partitions.shell", &partitions.shell),
            ("partitions.runtime", &partitions.runtime),
            ("partitions.api", &partitions.api),
        ] {
            if name.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }
        if partitions.api == partitions.shell || partitions.api == partitions.runtime {
            return Err(invalid("partitions.api", "must not share a name with the shell or runtime partition"));
        }

        if self.shell_files.is_empty() {
            return Err(invalid("shell_files", "must list at least one path"));
        }

        if partitions.shell == partitions.runtime {
            tracing::debug!(partition = %partitions.shell, "shell and runtime assets share one partition");
        }

        Ok(())
    }
}
