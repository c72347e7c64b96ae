//! The capability host subsystem (§5): a manifest-driven supervisor of
//! external tool-providing servers, reached over stdio subprocesses or plain
//! HTTP JSON-RPC, behind one transport-agnostic session contract.

mod host;
mod http;
mod manifest;
mod protocol;
mod session;
mod stdio;

pub use host::CapabilityHost;
pub use manifest::{Kind, Manifest, ServerDescriptor};
pub use session::{CapabilitySession, ToolDescriptor, ToolResult};
