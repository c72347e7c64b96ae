//! Configuration validation.
//!
//! Invalid thresholds are fatal (§4.G); everything else validation can flag
//! is a non-fatal warning with a suggested fix.

use super::types::Config;
use crate::error::{Error, Result};

/// Result of configuration validation.
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A single validation finding.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Validate a configuration record, collecting warnings and errors without
/// raising. Use [`validate_config_fatal`] at startup to turn any error into
/// a `Configuration-Invalid` failure.
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    if !(0.0 < config.intent_store.match_threshold && config.intent_store.match_threshold <= 1.0) {
        result = result.with_error(
            ValidationIssue::new(
                "intent_store.match_threshold",
                format!(
                    "invalid intent match threshold: {}. Must be in (0, 1].",
                    config.intent_store.match_threshold
                ),
            )
            .with_suggestion("set INTENT_MATCH_THRESHOLD to a value in (0, 1]"),
        );
    }

    if !(0.0 < config.intent_store.insertion_threshold
        && config.intent_store.insertion_threshold <= 1.0)
    {
        result = result.with_error(
            ValidationIssue::new(
                "intent_store.insertion_threshold",
                format!(
                    "invalid intent insertion threshold: {}. Must be in (0, 1].",
                    config.intent_store.insertion_threshold
                ),
            )
            .with_suggestion("set INTENT_INSERTION_THRESHOLD to a value in (0, 1]"),
        );
    }

    if !config.intent_store.persist_dir.exists() {
        result = result.with_warning(
            ValidationIssue::new(
                "intent_store.persist_dir",
                format!(
                    "intent store persist directory '{}' does not exist; it will be created automatically",
                    config.intent_store.persist_dir.display()
                ),
            ),
        );
    }

    if config.llm.api_key.expose_secret_is_empty() {
        result = result.with_warning(
            ValidationIssue::new(
                "llm.api_key",
                "no LLM API key configured; reason and act phases will fail at call time",
            )
            .with_suggestion("set OPENAI_API_KEY"),
        );
    }

    result
}

/// Validate and turn any error finding into a fatal `ConfigurationInvalid`.
pub fn validate_config_fatal(config: &Config) -> Result<()> {
    let result = validate_config(config);
    if !result.valid {
        let messages: Vec<String> = result.errors.iter().map(|e| e.message.clone()).collect();
        return Err(Error::ConfigurationInvalid(messages.join("; ")));
    }
    Ok(())
}

trait SecretStringExt {
    fn expose_secret_is_empty(&self) -> bool;
}

impl SecretStringExt for secrecy::SecretString {
    fn expose_secret_is_empty(&self) -> bool {
        use secrecy::ExposeSecret;
        self.expose_secret().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_warnings_but_no_errors() {
        let config = Config::default();
        let result = validate_config(&config);
        assert!(result.errors.is_empty());
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn out_of_range_threshold_is_an_error() {
        let mut config = Config::default();
        config.intent_store.insertion_threshold = 1.5;
        let result = validate_config(&config);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn zero_threshold_is_an_error() {
        let mut config = Config::default();
        config.intent_store.match_threshold = 0.0;
        let result = validate_config(&config);
        assert!(!result.valid);
    }
}
