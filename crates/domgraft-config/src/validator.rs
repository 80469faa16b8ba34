//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Collapse errors into a single [`ConfigError::Invalid`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        let message = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Invalid(message))
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_api(config, &mut result);
        Self::validate_engine(config, &mut result);
        Self::validate_logging(config, &mut result);
        result
    }

    fn validate_api(config: &Config, result: &mut ValidationResult) {
        let api = &config.api;
        let base_url = api.base_url.trim();
        if base_url.is_empty() {
            result.add_error(ValidationError::new("api.base_url", "base_url cannot be empty"));
        } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            result.add_error(ValidationError::new(
                "api.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        if api.page_size == 0 {
            result.add_error(ValidationError::new(
                "api.page_size",
                "page_size must be greater than 0",
            ));
        }

        if api.delete_batch_size == 0 {
            result.add_error(ValidationError::new(
                "api.delete_batch_size",
                "delete_batch_size must be greater than 0",
            ));
        }

        if api.request_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "api.request_timeout_secs",
                "request_timeout_secs must be greater than 0",
            ));
        }

        if api.connect_timeout_secs > api.request_timeout_secs {
            result.add_warning(ValidationWarning::new(
                "api.connect_timeout_secs",
                "connect timeout exceeds the request timeout and will never fire",
            ));
        }

        for name in api.headers.keys() {
            if name.trim().is_empty() || name.contains(char::is_whitespace) {
                result.add_error(ValidationError::new(
                    format!("api.headers.{}", name),
                    "header names cannot be empty or contain whitespace",
                ));
            }
        }
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        if config.engine.max_flush_rounds == 0 {
            result.add_error(ValidationError::new(
                "engine.max_flush_rounds",
                "max_flush_rounds must be greater than 0",
            ));
        }

        if config.engine.default_debounce_ms > 5_000 {
            result.add_warning(ValidationWarning::new(
                "engine.default_debounce_ms",
                "debounce above 5s will make patches feel unresponsive",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        let level = config.logging.level.to_ascii_lowercase();
        // Full filter directives (e.g. "domgraft_core=debug") are passed through.
        if !level.contains('=') && !valid_levels.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, valid_levels
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
