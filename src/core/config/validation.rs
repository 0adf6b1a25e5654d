#![allow(clippy::result_large_err)]

use super::MigratorConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &MigratorConfig) -> Result<(), AppError> {
        let base_url = config.service.base_url.trim();
        if base_url.is_empty() {
            return Err(invalid("service.base_url cannot be empty"));
        }
        let parsed = url::Url::parse(base_url).map_err(|e| {
            invalid(format!(
                "service.base_url '{}' is not a valid URL: {}",
                base_url, e
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "service.base_url must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if config.service.request_timeout_secs == 0 {
            return Err(invalid("service.request_timeout_secs must be greater than 0"));
        }

        if config.sync.interval_secs == 0 {
            return Err(invalid("sync.interval_secs must be greater than 0"));
        }

        if config.store.state_dir.as_os_str().is_empty() {
            return Err(invalid("store.state_dir cannot be empty"));
        }

        if let Some(file) = &config.catalog.file {
            if file.as_os_str().is_empty() {
                return Err(invalid("catalog.file cannot be empty when set"));
            }
        }

        Ok(())
    }
}

fn invalid<T: Into<String>>(message: T) -> AppError {
    AppError::new(ErrorCategory::ConfigurationError, message).with_code("CONFIG")
}
