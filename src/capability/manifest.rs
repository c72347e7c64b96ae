//! Capability server manifest (§6).
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "<name>": {
//!       "command": "<string>",
//!       "args": ["<string>", ...],
//!       "env": { "<K>": "<V>", ... },
//!       "url": "<string>",
//!       "enabled": true
//!     }
//!   }
//! }
//! ```
//! A descriptor missing both `command` and `url` is skipped with a warning.
//! Additional keys are ignored by `serde`'s default (non-deny-unknown-fields)
//! behavior.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level manifest document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: BTreeMap<String, ServerDescriptor>,
}

/// One capability server's immutable startup descriptor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerDescriptor {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Which transport a descriptor resolves to, decided purely by presence of
/// `command` or `url` (§4.D step 1). Both present prefers stdio, since
/// `command` is the more specific local-process declaration; both absent is
/// not representable as a `Kind` and must be checked for separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Stdio,
    Http,
}

impl ServerDescriptor {
    /// Classify this descriptor's transport, or `None` if it names neither
    /// `command` nor `url` and must be skipped with a warning.
    pub fn classify(&self) -> Option<Kind> {
        if self.command.is_some() {
            Some(Kind::Stdio)
        } else if self.url.is_some() {
            Some(Kind::Http)
        } else {
            None
        }
    }
}

impl Manifest {
    /// Load and parse a manifest file. Any I/O or parse failure is a fatal
    /// `Manifest-Load` error (§7) since the host cannot start without it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ManifestLoad(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::ManifestLoad(format!("invalid manifest JSON: {}", e)))
    }

    /// Iterate the enabled descriptors in stable, sorted-by-name order.
    pub fn enabled_servers(&self) -> impl Iterator<Item = (&String, &ServerDescriptor)> {
        self.mcp_servers.iter().filter(|(_, d)| d.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_stdio_and_http_and_neither() {
        let stdio = ServerDescriptor {
            command: Some("mail-server".to_string()),
            args: vec![],
            env: BTreeMap::new(),
            url: None,
            enabled: true,
        };
        assert_eq!(stdio.classify(), Some(Kind::Stdio));

        let http = ServerDescriptor {
            command: None,
            args: vec![],
            env: BTreeMap::new(),
            url: Some("https://example.test".to_string()),
            enabled: true,
        };
        assert_eq!(http.classify(), Some(Kind::Http));

        let neither = ServerDescriptor {
            command: None,
            args: vec![],
            env: BTreeMap::new(),
            url: None,
            enabled: true,
        };
        assert_eq!(neither.classify(), None);
    }

    #[test]
    fn disabled_servers_are_excluded_from_enabled_iteration() {
        let json = r#"{
            "mcpServers": {
                "a": { "command": "a-bin", "enabled": false },
                "b": { "command": "b-bin" }
            }
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        let names: Vec<&String> = manifest.enabled_servers().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn unknown_top_level_keys_are_ignored() {
        let json = r#"{
            "mcpServers": { "a": { "command": "a-bin" } },
            "someFutureField": 42
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.mcp_servers.len(), 1);
    }
}
