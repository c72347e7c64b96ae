//! Stdio capability session: a subprocess speaking one JSON-RPC object per
//! line over its stdin/stdout pipes.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::debug;

use super::protocol::{RpcRequest, RpcResponse, RpcTool, RpcToolResult};
use super::session::{CapabilitySession, ToolDescriptor, ToolResult};
use crate::capability::manifest::ServerDescriptor;
use crate::error::{Error, Result};

/// A capability session backed by a child process.
pub struct StdioSession {
    name: String,
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    stdout: Mutex<BufReader<tokio::process::ChildStdout>>,
    next_id: AtomicU64,
}

impl StdioSession {
    /// Spawn the descriptor's command and perform the initialize handshake.
    /// The caller is expected to hold this session inside a scoped-resource
    /// guard (see [`crate::capability::host::CapabilityHost`]) so the child
    /// is reliably killed on every exit path.
    pub async fn start(name: &str, descriptor: &ServerDescriptor) -> Result<Self> {
        let command = descriptor
            .command
            .as_deref()
            .ok_or_else(|| Error::ServerStart(name.to_string(), "descriptor has no command".to_string()))?;

        debug!("starting stdio capability server '{}': {} {:?}", name, command, descriptor.args);

        let mut cmd = Command::new(command);
        cmd.args(&descriptor.args)
            .envs(&descriptor.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::ServerStart(name.to_string(), format!("failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::ServerStart(name.to_string(), "failed to capture stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ServerStart(name.to_string(), "failed to capture stdout".to_string()))?;

        let session = StdioSession {
            name: name.to_string(),
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            next_id: AtomicU64::new(1),
        };

        session
            .send_request(RpcRequest::initialize(session.next_id()))
            .await
            .map_err(|e| Error::ServerStart(name.to_string(), format!("initialize handshake failed: {}", e)))?;

        Ok(session)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn send_request(&self, request: RpcRequest) -> Result<RpcResponse> {
        let json = serde_json::to_string(&request)?;

        debug!("stdio request -> {}: {}", self.name, json);

        {
            let mut stdin = self.stdin.lock().await;
            stdin
                .write_all(json.as_bytes())
                .await
                .map_err(|e| Error::ToolInvoke(format!("failed to write to '{}': {}", self.name, e)))?;
            stdin
                .write_all(b"\n")
                .await
                .map_err(|e| Error::ToolInvoke(format!("failed to write newline to '{}': {}", self.name, e)))?;
            stdin
                .flush()
                .await
                .map_err(|e| Error::ToolInvoke(format!("failed to flush stdin for '{}': {}", self.name, e)))?;
        }

        let mut line = String::new();
        {
            let mut stdout = self.stdout.lock().await;
            stdout
                .read_line(&mut line)
                .await
                .map_err(|e| Error::ToolInvoke(format!("failed to read from '{}': {}", self.name, e)))?;
        }

        debug!("stdio response <- {}: {}", self.name, line.trim());

        let response: RpcResponse = serde_json::from_str(line.trim())
            .map_err(|e| Error::ToolInvoke(format!("failed to parse response from '{}': {}", self.name, e)))?;

        if let Some(ref err) = response.error {
            return Err(Error::ToolInvoke(format!(
                "{} returned error {}: {}",
                self.name, err.code, err.message
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl CapabilitySession for StdioSession {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let response = self.send_request(RpcRequest::list_tools(self.next_id())).await?;
        let result = response.result.unwrap_or_default();
        let tools: Vec<RpcTool> = result
            .get("tools")
            .and_then(|t| serde_json::from_value(t.clone()).ok())
            .unwrap_or_default();

        Ok(tools
            .into_iter()
            .map(|t| ToolDescriptor {
                server_name: self.name.clone(),
                tool_name: t.name,
                description: t.description,
                input_schema: serde_json::json!({
                    "type": t.input_schema.schema_type,
                    "properties": t.input_schema.properties,
                    "required": t.input_schema.required,
                }),
            })
            .collect())
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolResult> {
        let response = self
            .send_request(RpcRequest::call_tool(self.next_id(), tool_name, arguments))
            .await?;
        let result = response.result.unwrap_or_default();
        let tool_result: RpcToolResult = serde_json::from_value(result)?;

        Ok(ToolResult {
            content: serde_json::to_value(&tool_result.content)?,
            is_error: tool_result.is_error,
        })
    }

    async fn close(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        let _ = child.start_kill();
        let _ = child.wait().await;
        Ok(())
    }
}

impl Drop for StdioSession {
    fn drop(&mut self) {
        if let Ok(mut child) = self.child.try_lock() {
            let _ = child.start_kill();
        }
    }
}
