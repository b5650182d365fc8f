//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, INTERLEAVE_NAMES};

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

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

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
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

/// A validation warning.
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
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_kernel(config, &mut result);
        Self::validate_scheduler(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_kernel(config: &Config, result: &mut ValidationResult) {
        if config.kernel.interrupt_check_rate == 0 {
            result.add_error(ValidationError::new(
                "kernel.interrupt_check_rate",
                "interrupt_check_rate must be at least 1",
            ));
        }

        if config.kernel.transport_timeout_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "kernel.transport_timeout_ms",
                "transport timeout disabled, a silent client can stall a run indefinitely",
            ));
        }

        if config.kernel.max_rhs_result_len == 0 {
            result.add_error(ValidationError::new(
                "kernel.max_rhs_result_len",
                "max_rhs_result_len must be greater than 0",
            ));
        }
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        let interleave = config.scheduler.default_interleave.as_str();
        if !INTERLEAVE_NAMES.contains(&interleave) {
            result.add_error(ValidationError::new(
                "scheduler.default_interleave",
                format!(
                    "Unknown interleave '{}', valid values: {:?}",
                    interleave, INTERLEAVE_NAMES
                ),
            ));
        }

        if config.scheduler.max_nil_output_cycles == 0 {
            result.add_error(ValidationError::new(
                "scheduler.max_nil_output_cycles",
                "max_nil_output_cycles must be at least 1",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "'{}' is not a plain level, it will be parsed as a filter directive",
                    config.logging.level
                ),
            ));
        }

        if let Some(ref dir) = config.logging.directory {
            if dir.trim().is_empty() {
                result.add_error(ValidationError::new(
                    "logging.directory",
                    "Log directory cannot be empty",
                ));
            }
        }
    }
}
