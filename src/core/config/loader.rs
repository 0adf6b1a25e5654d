#![allow(clippy::result_large_err)]

use super::{ConfigValidator, MigratorConfig};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "migrator.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/migrator.toml).
    /// Environment variables override config file values; a missing file means defaults.
    /// Relative paths are resolved against the workspace.
    pub fn load_from_workspace(workspace_path: &Path) -> Result<MigratorConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();

        Self::apply_env_overrides(&mut config)?;
        ConfigValidator::validate(&config)?;
        Self::resolve_paths(&mut config, workspace_path);

        Ok(config)
    }

    /// Load config from specific file path.
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<MigratorConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: MigratorConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration.
    /// Unparsable numeric or boolean values are configuration errors.
    fn apply_env_overrides(config: &mut MigratorConfig) -> Result<(), AppError> {
        if let Ok(url) = env::var("MIGRATOR_SERVICE_URL") {
            config.service.base_url = url;
        }

        if let Ok(timeout) = env::var("MIGRATOR_SERVICE_TIMEOUT_SECS") {
            config.service.request_timeout_secs = parse_env("MIGRATOR_SERVICE_TIMEOUT_SECS", &timeout)?;
        }

        if let Ok(interval) = env::var("MIGRATOR_SYNC_INTERVAL_SECS") {
            config.sync.interval_secs = parse_env("MIGRATOR_SYNC_INTERVAL_SECS", &interval)?;
        }

        if let Ok(skip) = env::var("MIGRATOR_SYNC_SKIP_OVERLAPPING") {
            config.sync.skip_overlapping = parse_env("MIGRATOR_SYNC_SKIP_OVERLAPPING", &skip)?;
        }

        if let Ok(state_dir) = env::var("MIGRATOR_STATE_DIR") {
            config.store.state_dir = PathBuf::from(state_dir);
        }

        if let Ok(catalog_file) = env::var("MIGRATOR_CATALOG_FILE") {
            config.catalog.file = Some(PathBuf::from(catalog_file));
        }

        Ok(())
    }

    fn resolve_paths(config: &mut MigratorConfig, workspace_path: &Path) {
        if config.store.state_dir.is_relative() {
            config.store.state_dir = workspace_path.join(&config.store.state_dir);
        }
        if let Some(file) = config.catalog.file.as_mut() {
            if file.is_relative() {
                *file = workspace_path.join(&*file);
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "MIGRATOR_SERVICE_URL - Transformation service base URL (default: http://localhost:8000)",
            "MIGRATOR_SERVICE_TIMEOUT_SECS - Per-request timeout in seconds (default: 30)",
            "MIGRATOR_SYNC_INTERVAL_SECS - Status refresh interval in seconds (default: 5)",
            "MIGRATOR_SYNC_SKIP_OVERLAPPING - Skip a refresh while one is outstanding (true/false, default: true)",
            "MIGRATOR_STATE_DIR - Local state directory (default: .migrator/state)",
            "MIGRATOR_CATALOG_FILE - TOML option catalog replacing the built-in one",
            "MIGRATOR_LOG_LEVEL - Default log level when RUST_LOG is unset (default: info)",
        ]
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AppError> {
    value.trim().parse::<T>().map_err(|_| {
        AppError::new(
            ErrorCategory::ConfigurationError,
            format!("{} has an invalid value '{}'", name, value),
        )
    })
}
