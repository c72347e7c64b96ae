//! Core configuration types.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process-wide settings for the cognitive kernel (spec §4.G).
///
/// A single validated record: collection persistence path, collection name,
/// LLM credentials and model id, the two intent thresholds, the default
/// iteration budget, and the template root path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub intent_store: IntentStoreConfig,
    pub capability_manifest: PathBuf,
    pub default_max_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            llm: LlmConfig::default(),
            intent_store: IntentStoreConfig::default(),
            capability_manifest: PathBuf::from("mcp_config.json"),
            default_max_iterations: 10,
        }
    }
}

/// LLM provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Bearer credential for the chat-completions endpoint. Never rendered
    /// in `Debug` output.
    #[serde(skip_serializing)]
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            api_key: SecretString::from(String::new()),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

/// Intent Store persistence and matching thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentStoreConfig {
    pub persist_dir: PathBuf,
    pub collection_name: String,
    /// Minimum similarity for a query hit to be offered to the act phase.
    pub match_threshold: f32,
    /// Minimum similarity for the Intent Index Builder to merge into an
    /// existing node rather than inserting a new one.
    pub insertion_threshold: f32,
}

impl Default for IntentStoreConfig {
    fn default() -> Self {
        IntentStoreConfig {
            persist_dir: PathBuf::from("./intent_store_data"),
            collection_name: "intent_store".to_string(),
            match_threshold: 0.7,
            insertion_threshold: 0.92,
        }
    }
}
