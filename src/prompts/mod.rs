//! Prompt rendering (§4.B): a fixed, named template catalogue with no side
//! effects beyond template expansion.

mod renderer;

pub use renderer::{names, PromptRenderer};
