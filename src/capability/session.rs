//! The transport-agnostic session contract both stdio and http capability
//! sessions implement, so the [`super::host::CapabilityHost`] never branches
//! on transport kind after startup (§4.D).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A read-only snapshot of what a server reported about one of its tools at
/// startup.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub server_name: String,
    pub tool_name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// The canonical `tool::<server>::<tool>` identifier for this tool.
    pub fn uri(&self) -> String {
        format!("tool::{}::{}", self.server_name, self.tool_name)
    }
}

/// The opaque result of one `call_tool` invocation. The host and loop do not
/// interpret its contents; they serialize it to a short string for the task
/// trace.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: Value,
    pub is_error: bool,
}

impl ToolResult {
    /// A short, trace-friendly rendering of the result.
    pub fn to_trace_string(&self) -> String {
        let rendered = serde_json::to_string(&self.content).unwrap_or_else(|_| "<unserializable>".to_string());
        if rendered.len() > 500 {
            format!("{}...", &rendered[..500])
        } else {
            rendered
        }
    }
}

/// A live handle to one started capability server.
///
/// Lifecycle: created during host startup, initialized via a handshake, used
/// for `list_tools`/`call_tool`, closed on host shutdown. Sessions are never
/// recreated mid-run on failure (§3).
#[async_trait]
pub trait CapabilitySession: Send + Sync {
    fn server_name(&self) -> &str;

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolResult>;

    /// Release the underlying transport. Idempotent; called at most once by
    /// the host's shutdown, but must also be safe if the session is simply
    /// dropped without an explicit close (the transport's own `Drop` is the
    /// backstop).
    async fn close(&self) -> Result<()>;
}
