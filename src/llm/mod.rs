//! LLM transport: the chat-completions contract the core depends on (§6),
//! and the one concrete HTTP implementation shipped.

mod client;
mod types;

pub use client::{HttpLlmClient, LlmClient};
pub use types::{
    AssistantToolCall, ChatCompletionRequest, ChatCompletionResponse, Choice, FunctionCall,
    FunctionDefinition, GenerationOptions, Message, Role, ToolChoice, ToolDefinition, Usage,
};
