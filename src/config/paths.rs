//! Configuration and state directory resolution.
//!
//! Each path resolves an explicit environment-variable override first, then
//! falls back to the XDG-style directory for the platform.

use std::path::PathBuf;

/// Directory holding the kernel's configuration file.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COGKERNEL_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    dirs::config_dir()
        .map(|d| d.join("cogkernel"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".config").join("cogkernel"))
                .unwrap_or_else(|| PathBuf::from(".cogkernel"))
        })
}

/// Path to the main configuration file.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("COGKERNEL_CONFIG") {
        return PathBuf::from(path);
    }

    config_dir().join("config.json")
}

/// Directory for durable kernel state (the intent store persistence
/// directory defaults under here when not overridden explicitly).
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COGKERNEL_STATE_DIR") {
        return PathBuf::from(dir);
    }

    dirs::data_dir()
        .map(|d| d.join("cogkernel"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local").join("share").join("cogkernel"))
                .unwrap_or_else(|| PathBuf::from(".cogkernel"))
        })
}

/// Directory the Prompt Renderer falls back to when looking for
/// user-supplied templates that override the embedded defaults.
pub fn template_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COGKERNEL_TEMPLATE_DIR") {
        return PathBuf::from(dir);
    }

    config_dir().join("prompts")
}

/// Ensure a directory exists, creating it and any missing parents.
pub fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_do_not_panic() {
        let _ = config_dir();
        let _ = config_path();
        let _ = state_dir();
        let _ = template_dir();
    }
}
