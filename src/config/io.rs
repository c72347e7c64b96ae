//! Configuration loading and saving.
//!
//! Precedence, lowest to highest: compiled-in defaults, an optional config
//! file (format detected by extension, `json5` or `toml`), then environment
//! variables (loaded from an optional `.env` file via `dotenvy`, then the
//! process environment).

use std::path::Path;

use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration using the full precedence chain.
pub fn load_config() -> Result<Config> {
    let path = super::paths::config_path();
    let from_file = if path.exists() {
        load_config_from_path(&path)?
    } else {
        Config::default()
    };

    apply_env_overrides(from_file)
}

/// Load configuration from a specific file path.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::ConfigurationInvalid(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content)
            .map_err(|e| Error::ConfigurationInvalid(format!("invalid TOML config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(&content)
            .map_err(|e| Error::ConfigurationInvalid(format!("invalid JSON config: {}", e)))?
    } else {
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content))
            .map_err(|e| Error::ConfigurationInvalid(format!("failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment-variable overrides on top of a base configuration.
///
/// Mirrors the variable names §6 documents: `OPENAI_API_KEY`,
/// `OPENAI_MODEL`, `INTENT_DB_PERSIST_DIR`, `INTENT_COLLECTION_NAME`,
/// `INTENT_MATCH_THRESHOLD`, `INTENT_INSERTION_THRESHOLD`,
/// `DEFAULT_MAX_PROCESSES` (read as the default iteration budget). An unset
/// variable leaves the existing value untouched; a set variable that fails
/// to parse as its target type is fatal, per §6 ("invalid numeric or
/// out-of-range values are fatal") — out-of-range values are instead caught
/// later by `validate_config_fatal`.
pub fn apply_env_overrides(mut config: Config) -> Result<Config> {
    use secrecy::SecretString;

    dotenvy::dotenv().ok();

    if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
        config.llm.api_key = SecretString::from(api_key);
    }
    if let Ok(model) = std::env::var("OPENAI_MODEL") {
        config.llm.model = model;
    }
    if let Ok(dir) = std::env::var("INTENT_DB_PERSIST_DIR") {
        config.intent_store.persist_dir = std::path::PathBuf::from(dir);
    }
    if let Ok(name) = std::env::var("INTENT_COLLECTION_NAME") {
        config.intent_store.collection_name = name;
    }
    if let Ok(threshold) = std::env::var("INTENT_MATCH_THRESHOLD") {
        config.intent_store.match_threshold = threshold.parse().map_err(|_| {
            Error::ConfigurationInvalid(format!("INTENT_MATCH_THRESHOLD is not a valid number: '{}'", threshold))
        })?;
    }
    if let Ok(threshold) = std::env::var("INTENT_INSERTION_THRESHOLD") {
        config.intent_store.insertion_threshold = threshold.parse().map_err(|_| {
            Error::ConfigurationInvalid(format!("INTENT_INSERTION_THRESHOLD is not a valid number: '{}'", threshold))
        })?;
    }
    if let Ok(max_processes) = std::env::var("DEFAULT_MAX_PROCESSES") {
        config.default_max_iterations = max_processes.parse().map_err(|_| {
            Error::ConfigurationInvalid(format!("DEFAULT_MAX_PROCESSES is not a valid integer: '{}'", max_processes))
        })?;
    }

    Ok(config)
}

/// Save configuration to a file.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config)
            .map_err(|e| Error::ConfigurationInvalid(format!("failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::default();
        save_config(&config, &path).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.llm.model, config.llm.model);
        assert_eq!(
            loaded.intent_store.insertion_threshold,
            config.intent_store.insertion_threshold
        );
    }

    #[test]
    fn env_overrides_apply_on_top_of_defaults() {
        std::env::set_var("INTENT_INSERTION_THRESHOLD", "0.5");
        let config = apply_env_overrides(Config::default()).unwrap();
        assert_eq!(config.intent_store.insertion_threshold, 0.5);
        std::env::remove_var("INTENT_INSERTION_THRESHOLD");
    }

    #[test]
    fn unparseable_env_override_is_fatal() {
        std::env::set_var("INTENT_INSERTION_THRESHOLD", "not-a-number");
        let result = apply_env_overrides(Config::default());
        std::env::remove_var("INTENT_INSERTION_THRESHOLD");
        assert!(result.is_err());
    }
}
