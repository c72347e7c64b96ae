//! Configuration module.
//!
//! Split into focused submodules the way the rest of the kernel's modules
//! are organized: `types` for the data, `io` for loading/saving, `paths`
//! for directory resolution, `validation` for the `get_config` /
//! `validate_config` testability pair (spec §4.G).

mod io;
mod paths;
mod types;
mod validation;

pub use types::{Config, IntentStoreConfig, LlmConfig};

pub use io::{apply_env_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path, ensure_dir, state_dir, template_dir};
pub use validation::{validate_config, validate_config_fatal, ConfigValidationResult, ValidationIssue};
