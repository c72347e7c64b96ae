//! HTTP capability session: a remote server speaking JSON-RPC 2.0 over a
//! single POST endpoint, one request/response pair per call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::manifest::ServerDescriptor;
use super::protocol::{RpcRequest, RpcResponse, RpcTool, RpcToolResult};
use super::session::{CapabilitySession, ToolDescriptor, ToolResult};
use crate::error::{Error, Result};

/// A capability session backed by an HTTP endpoint.
pub struct HttpSession {
    name: String,
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpSession {
    pub async fn start(name: &str, descriptor: &ServerDescriptor) -> Result<Self> {
        let url = descriptor
            .url
            .clone()
            .ok_or_else(|| Error::ServerStart(name.to_string(), "descriptor has no url".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::ServerStart(name.to_string(), format!("failed to build http client: {}", e)))?;

        let session = HttpSession {
            name: name.to_string(),
            url,
            client,
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
        debug!("http request -> {}: {:?}", self.name, request.method);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ToolInvoke(format!("request to '{}' failed: {}", self.name, e)))?;

        if !response.status().is_success() {
            return Err(Error::ToolInvoke(format!(
                "'{}' responded with status {}",
                self.name,
                response.status()
            )));
        }

        let rpc_response: RpcResponse = response
            .json()
            .await
            .map_err(|e| Error::ToolInvoke(format!("failed to parse response from '{}': {}", self.name, e)))?;

        if let Some(ref err) = rpc_response.error {
            return Err(Error::ToolInvoke(format!(
                "{} returned error {}: {}",
                self.name, err.code, err.message
            )));
        }

        Ok(rpc_response)
    }
}

#[async_trait]
impl CapabilitySession for HttpSession {
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

    /// HTTP sessions hold no persistent connection to release; requests are
    /// one-shot POSTs, so closing is a no-op.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
