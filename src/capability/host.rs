//! The capability host: starts every enabled server named in a manifest,
//! exposes a uniform list/invoke surface over all of them, and guarantees
//! every started session is closed on shutdown (§5).

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use super::http::HttpSession;
use super::manifest::{Kind, Manifest};
use super::session::{CapabilitySession, ToolDescriptor, ToolResult};
use super::stdio::StdioSession;
use crate::error::{Error, Result};

/// Supervises the set of live capability sessions for one run.
///
/// Sessions are acquired in manifest order during [`CapabilityHost::startup`]
/// and released in reverse order during [`CapabilityHost::shutdown`], which
/// is also run as a backstop by `Drop` for any session `shutdown` did not
/// reach (panics, early returns).
pub struct CapabilityHost {
    sessions: Vec<Box<dyn CapabilitySession>>,
}

impl CapabilityHost {
    /// Load `manifest_path` and start every enabled server it names.
    /// A server with no `command` and no `url` is skipped with a warning,
    /// not a fatal error, per §4.D.
    pub async fn startup(manifest_path: &Path) -> Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let mut sessions: Vec<Box<dyn CapabilitySession>> = Vec::new();

        for (name, descriptor) in manifest.enabled_servers() {
            match descriptor.classify() {
                Some(Kind::Stdio) => {
                    info!("starting stdio capability server '{}'", name);
                    match StdioSession::start(name, descriptor).await {
                        Ok(session) => sessions.push(Box::new(session)),
                        Err(e) => warn!("failed to start stdio capability server '{}': {}", name, e),
                    }
                }
                Some(Kind::Http) => {
                    info!("starting http capability server '{}'", name);
                    match HttpSession::start(name, descriptor).await {
                        Ok(session) => sessions.push(Box::new(session)),
                        Err(e) => warn!("failed to start http capability server '{}': {}", name, e),
                    }
                }
                None => {
                    warn!(
                        "skipping capability server '{}': descriptor has neither 'command' nor 'url'",
                        name
                    );
                }
            }
        }

        Ok(CapabilityHost { sessions })
    }

    /// List every tool advertised by every live session, in session-start
    /// order. A single server's `list_tools` failure does not abort the
    /// whole listing; it is logged and that server's tools are omitted.
    pub async fn list_all_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut all = Vec::new();
        for session in &self.sessions {
            match session.list_tools().await {
                Ok(tools) => all.extend(tools),
                Err(e) => warn!("failed to list tools for '{}': {}", session.server_name(), e),
            }
        }
        Ok(all)
    }

    /// Invoke one tool on the named server.
    pub async fn call_tool(&self, server_name: &str, tool_name: &str, arguments: serde_json::Value) -> Result<ToolResult> {
        let session = self
            .sessions
            .iter()
            .find(|s| s.server_name() == server_name)
            .ok_or_else(|| Error::UnknownServer(server_name.to_string()))?;
        session.call_tool(tool_name, arguments).await
    }

    /// Close every session in the reverse of its acquisition order.
    pub async fn shutdown(&self) -> Result<()> {
        for session in self.sessions.iter().rev() {
            if let Err(e) = session.close().await {
                warn!("error closing capability server '{}': {}", session.server_name(), e);
            }
        }
        Ok(())
    }

    /// Build a host around an already-started set of sessions, bypassing
    /// manifest loading. Used by tests that exercise the cognitive loop
    /// against in-process fake sessions instead of real subprocesses.
    #[cfg(test)]
    pub(crate) fn with_sessions(sessions: Vec<Box<dyn CapabilitySession>>) -> Self {
        CapabilityHost { sessions }
    }
}
