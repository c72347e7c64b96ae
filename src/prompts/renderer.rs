//! The prompt renderer (§4.B): pure template expansion from a fixed
//! catalogue, with an embedded default template set and an optional
//! override directory.

use std::path::{Path, PathBuf};

use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason,
};
use serde::Serialize;

use crate::error::{Error, Result};

const REASONING_TEMPLATE: &str = include_str!("templates/reasoning.hbs");
const ACTION_TEMPLATE: &str = include_str!("templates/action.hbs");
const GENERATE_L1_INTENT_TEMPLATE: &str = include_str!("templates/generate_l1_intent.hbs");
const GENERATE_L2_INTENT_TEMPLATE: &str = include_str!("templates/generate_l2_intent.hbs");

/// Template names the renderer's catalogue is keyed by.
pub mod names {
    pub const REASONING: &str = "reasoning";
    pub const ACTION: &str = "action";
    pub const GENERATE_L1_INTENT: &str = "generate_l1_intent";
    pub const GENERATE_L2_INTENT: &str = "generate_l2_intent";
}

fn json_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h
        .param(0)
        .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex("json", 0))?
        .value();
    out.write(&serde_json::to_string(value).unwrap_or_default())?;
    Ok(())
}

fn add1_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h
        .param(0)
        .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex("add1", 0))?
        .value()
        .as_u64()
        .unwrap_or(0);
    out.write(&(value + 1).to_string())?;
    Ok(())
}

/// Registers the default catalogue, then optionally overlays templates from
/// a directory (one `<name>.hbs` file per template) that override or
/// supplement individual entries by name.
pub struct PromptRenderer {
    registry: Handlebars<'static>,
}

impl PromptRenderer {
    /// Build a renderer with only the embedded default catalogue.
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_helper("json", Box::new(json_helper));
        registry.register_helper("add1", Box::new(add1_helper));

        registry.register_template_string(names::REASONING, REASONING_TEMPLATE)?;
        registry.register_template_string(names::ACTION, ACTION_TEMPLATE)?;
        registry.register_template_string(names::GENERATE_L1_INTENT, GENERATE_L1_INTENT_TEMPLATE)?;
        registry.register_template_string(names::GENERATE_L2_INTENT, GENERATE_L2_INTENT_TEMPLATE)?;

        Ok(PromptRenderer { registry })
    }

    /// Build a renderer from the default catalogue, then overlay any
    /// `<name>.hbs` files found directly under `override_dir`. A directory
    /// that does not exist is silently ignored (an override directory is
    /// optional, per §4.B).
    pub fn with_overrides(override_dir: &Path) -> Result<Self> {
        let mut renderer = Self::new()?;
        if !override_dir.is_dir() {
            return Ok(renderer);
        }

        for entry in std::fs::read_dir(override_dir).map_err(Error::Io)? {
            let entry = entry.map_err(Error::Io)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("hbs") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path).map_err(Error::Io)?;
            renderer.registry.register_template_string(stem, content)?;
        }

        Ok(renderer)
    }

    /// Render the named template with `data`. Fails with
    /// `Error::TemplateNotFound` if no template by that name is registered,
    /// a distinct, non-recoverable error kind per §4.B.
    pub fn render<T: Serialize>(&self, template_name: &str, data: &T) -> Result<String> {
        if !self.registry.has_template(template_name) {
            return Err(Error::TemplateNotFound(template_name.to_string()));
        }
        Ok(self.registry.render(template_name, data)?)
    }
}

/// Resolve the configured template override directory, if configuration
/// names one, defaulting to `None` when unset.
pub fn override_dir_from_config(configured: Option<&Path>) -> Option<PathBuf> {
    configured.map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_reasoning_template_with_empty_trace() {
        let renderer = PromptRenderer::new().unwrap();
        let rendered = renderer
            .render(
                names::REASONING,
                &json!({
                    "task_description": "say hello",
                    "trace": [],
                    "timestamp": "2026-01-01T00:00:00Z",
                }),
            )
            .unwrap();
        assert!(rendered.contains("say hello"));
        assert!(rendered.contains("no steps taken yet"));
    }

    #[test]
    fn unknown_template_name_is_template_not_found() {
        let renderer = PromptRenderer::new().unwrap();
        let err = renderer.render("does_not_exist", &json!({})).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(_)));
    }

    #[test]
    fn action_template_renders_candidate_list() {
        let renderer = PromptRenderer::new().unwrap();
        let rendered = renderer
            .render(
                names::ACTION,
                &json!({
                    "task_description": "send an email",
                    "current_intent": "send an email to a recipient",
                    "intent_rationale": "user asked to email someone",
                    "options": [
                        {"id": "intent::L1::mail::send", "similarity": 0.95, "text": "sends an email", "metadata": {"type": "L1"}}
                    ],
                    "trace": [],
                    "timestamp": "2026-01-01T00:00:00Z",
                }),
            )
            .unwrap();
        assert!(rendered.contains("intent::L1::mail::send"));
        assert!(rendered.contains("1. id="));
    }
}
