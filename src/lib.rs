//! # cogkernel
//!
//! A cognitive agent kernel: it executes natural-language tasks by iterating
//! a bounded Reason/Act loop against an LLM, resolving each requested
//! capability through a two-level semantic intent index built over a set of
//! external capability servers.
//!
//! ## Architecture
//!
//! - **Configuration** (`config`): layered defaults/file/env configuration, split into focused modules
//! - **LLM transport** (`llm`): the chat-completions contract the kernel consumes, and one HTTP implementation
//! - **Capability host** (`capability`): manifest-driven supervisor of stdio and HTTP capability servers
//! - **Intent index** (`intent`): the L1/L2 semantic index, its vector-store façade, and the builder that keeps it in sync with the manifest
//! - **Prompts** (`prompts`): a fixed, named Handlebars template catalogue
//! - **Trace** (`trace`): the per-task reasoning/action/result log
//! - **Cognitive loop** (`cognitive_loop`): the Reason/Act state machine
//! - **Kernel** (`kernel`): the top-level value wiring every subsystem together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cogkernel::config::load_config;
//! use cogkernel::kernel::Kernel;
//! use cogkernel::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config()?;
//!     let kernel = Kernel::start(config).await?;
//!     let (outcome, _trace) = kernel.run_task("say hello", None).await?;
//!     println!("{:?}", outcome);
//!     kernel.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[path = "config/mod.rs"]
pub mod config;

pub mod capability;
pub mod cognitive_loop;
pub mod error;
pub mod intent;
pub mod kernel;
pub mod llm;
pub mod prompts;
pub mod trace;

pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
