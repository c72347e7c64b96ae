//! The fixed tool sets offered to each phase of the cognitive loop (§4.F).

use serde_json::json;

use crate::llm::ToolDefinition;

/// The three meta-tools offered during the reason phase, with `tool_choice`
/// = *auto* — the model may call none, in which case the iteration is
/// consumed without acting.
pub fn reasoning_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            "task_complete",
            "Declare the task fully satisfied and return its result.",
            json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string", "description": "Why the task is complete."},
                    "result": {"type": "string", "description": "The final result to report, if different from the reason."}
                },
                "required": ["reason"]
            }),
        ),
        ToolDefinition::function(
            "task_blocked",
            "Declare that no further progress can be made on the task.",
            json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string", "description": "Why the task cannot proceed."}
                },
                "required": ["reason"]
            }),
        ),
        ToolDefinition::function(
            "do",
            "Request a capability needed to make progress on the task.",
            json!({
                "type": "object",
                "properties": {
                    "intent": {"type": "string", "description": "A concrete, natural-language description of the capability needed next."},
                    "rationale": {"type": "string", "description": "Why this capability is needed now."}
                },
                "required": ["intent", "rationale"]
            }),
        ),
    ]
}

/// The four action-phase tools, offered with `tool_choice` = *required* —
/// the model must call exactly one.
pub fn action_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            "execute_tool",
            "Invoke a concrete capability tool by its URI.",
            json!({
                "type": "object",
                "properties": {
                    "tool_uri": {"type": "string", "description": "The tool URI, of the form tool::<server>::<tool>."},
                    "arguments": {"type": "object", "description": "Arguments matching the tool's input schema."}
                },
                "required": ["tool_uri", "arguments"]
            }),
        ),
        ToolDefinition::function(
            "refine_intent",
            "Narrow a category-level candidate into a more specific capability request.",
            json!({
                "type": "object",
                "properties": {
                    "intent_id": {"type": "string", "description": "The id of the candidate being refined."},
                    "explanation": {"type": "string", "description": "The narrower capability now being requested."}
                },
                "required": ["intent_id", "explanation"]
            }),
        ),
        ToolDefinition::function(
            "insufficient_information",
            "Declare that a suitable tool exists among the candidates but required arguments are unavailable.",
            json!({
                "type": "object",
                "properties": {
                    "missing": {"type": "string", "description": "What information is missing."}
                },
                "required": ["missing"]
            }),
        ),
        ToolDefinition::function(
            "no_suitable_tool",
            "Declare that none of the offered candidates fit the requested intent.",
            json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string", "description": "Why no candidate fits."}
                },
                "required": ["reason"]
            }),
        ),
    ]
}
