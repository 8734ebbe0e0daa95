//! Configuration validation.

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

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
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

        Self::validate_queue(config, &mut result);
        Self::validate_evaluator(config, &mut result);
        Self::validate_paths(config, &mut result);
        Self::validate_provider(config, &mut result);

        result
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        if config.queue.max_attempts == 0 {
            result.add_error(ValidationError::new(
                "queue.max_attempts",
                "max_attempts must be at least 1",
            ));
        }

        if config.queue.crash_retries == 0 {
            result.add_error(ValidationError::new(
                "queue.crash_retries",
                "crash_retries must be at least 1",
            ));
        }

        if config.queue.poll_interval_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "queue.poll_interval_ms",
                "poll interval of 0 spins while waiting on fixes",
            ));
        }
    }

    fn validate_evaluator(config: &Config, result: &mut ValidationResult) {
        if config.evaluator.pass_threshold > 100 {
            result.add_error(ValidationError::new(
                "evaluator.pass_threshold",
                "pass_threshold must be between 0 and 100",
            ));
        }

        if config.evaluator.max_sliders + config.evaluator.max_inputs + config.evaluator.max_buttons == 0 {
            result.add_warning(ValidationWarning::new(
                "evaluator",
                "all interaction limits are 0, interactive components will only get an initial capture",
            ));
        }
    }

    fn validate_paths(config: &Config, result: &mut ValidationResult) {
        let url = &config.paths.viewer_base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            result.add_error(ValidationError::new(
                "paths.viewer_base_url",
                "viewer_base_url must start with http:// or https://",
            ));
        }
    }

    fn validate_provider(config: &Config, result: &mut ValidationResult) {
        if config.provider.api_key.is_none() {
            result.add_warning(ValidationWarning::new(
                "provider.api_key",
                "API key is not set, GEMINI_API_KEY will be used",
            ));
        }

        if let Some(ref url) = config.provider.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "provider.base_url",
                    "base_url must start with http:// or https://",
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
