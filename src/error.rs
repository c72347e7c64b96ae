//! Error types for the cognitive kernel
//!
//! Variants map directly onto the error kinds the kernel distinguishes for
//! recovery purposes: some are fatal at startup, some degrade a single
//! capability server, and some are recorded into the task trace and never
//! escape the cognitive loop.

use thiserror::Error;

/// Result type alias using the kernel's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cognitive kernel
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration failed validation. Fatal at startup.
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// A named prompt template could not be found in the renderer's catalogue. Fatal.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// The capability manifest could not be read or parsed. Fatal: host cannot start.
    #[error("failed to load capability manifest: {0}")]
    ManifestLoad(String),

    /// An individual capability server failed to start. Logged; that server is
    /// omitted and the host continues with the remaining servers.
    #[error("capability server '{0}' failed to start: {1}")]
    ServerStart(String, String),

    /// A capability session failed to report its tool list. Logged; that
    /// server contributes no tools this run.
    #[error("capability server '{0}' failed to list tools: {1}")]
    ToolList(String, String),

    /// The LLM transport failed. Fatal in the builder; recorded and
    /// continued in the cognitive loop.
    #[error("LLM transport error: {0}")]
    LlmTransport(String),

    /// The vector store reported an I/O failure. Fatal in the builder;
    /// treated as an empty candidate set in the loop.
    #[error("intent store I/O error: {0}")]
    StoreIo(String),

    /// A tool URI did not match the `tool::<server>::<tool>` grammar.
    #[error("invalid tool URI '{0}': expected 'tool::<server>::<tool>'")]
    ToolUriParse(String),

    /// `execute_tool` named a server the host has no live session for.
    #[error("unknown capability server: {0}")]
    UnknownServer(String),

    /// `execute_tool` named a tool the server did not report at startup.
    #[error("unknown tool '{1}' on server '{0}'")]
    UnknownTool(String, String),

    /// A capability session's `call_tool` failed.
    #[error("tool invocation failed: {0}")]
    ToolInvoke(String),

    /// The cognitive loop exhausted its iteration budget without reaching a
    /// terminal state.
    #[error("iteration budget exceeded: {0}")]
    IterationBudgetExceeded(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error (reqwest).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Environment variable error.
    #[error("environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Resource not found (not raised for `get_by_id` misses, which return
    /// `Option::None` rather than an error).
    #[error("not found: {0}")]
    NotFound(String),

    /// Generic internal error for conditions with no dedicated kind above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error kind is fatal when raised during the Intent Index
    /// Builder's rebuild pass (the hash is left unwritten so the next
    /// startup retries).
    pub fn is_builder_fatal(&self) -> bool {
        matches!(self, Error::LlmTransport(_) | Error::StoreIo(_))
    }

    /// Whether this error kind is fatal at kernel startup, before any task
    /// is accepted.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigurationInvalid(_) | Error::TemplateNotFound(_) | Error::ManifestLoad(_)
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigurationInvalid(err.to_string())
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(err: handlebars::RenderError) -> Self {
        Error::Internal(format!("template render error: {}", err))
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Error::Internal(format!("invalid template: {}", err))
    }
}
