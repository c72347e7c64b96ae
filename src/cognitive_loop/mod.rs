//! The cognitive loop (§4.F): the bounded Reason/Act state machine that
//! drives one task to `COMPLETE` or `BLOCKED`.

mod tools;
mod uri;

use std::sync::Arc;

use serde_json::json;
use tracing::{error, warn};

use crate::capability::CapabilityHost;
use crate::error::Result;
use crate::intent::IntentStore;
use crate::llm::{GenerationOptions, LlmClient, Message, ToolChoice};
use crate::prompts::{names, PromptRenderer};
use crate::trace::TraceLog;

pub use uri::parse_tool_uri;

/// How many similarity candidates the act phase requests per `do` call.
const DEFAULT_CANDIDATE_COUNT: usize = 5;

/// The terminal result of a task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Complete { message: String },
    Blocked { reason: String },
}

/// Owns the dependencies a task run needs and drives the Reason/Act state
/// machine to completion.
pub struct CognitiveLoop {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn IntentStore>,
    host: Arc<CapabilityHost>,
    renderer: Arc<PromptRenderer>,
    match_threshold: f32,
}

impl CognitiveLoop {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn IntentStore>,
        host: Arc<CapabilityHost>,
        renderer: Arc<PromptRenderer>,
        match_threshold: f32,
    ) -> Self {
        CognitiveLoop {
            llm,
            store,
            host,
            renderer,
            match_threshold,
        }
    }

    /// Run one task to completion, or until `max_iterations` is exhausted.
    pub async fn run_task(&self, description: &str, max_iterations: u32) -> Result<(TaskOutcome, TraceLog)> {
        let mut trace = TraceLog::new();
        trace.reset();

        for _ in 0..max_iterations {
            match self.reason(description, &trace).await {
                ReasonDecision::Complete { reason, result } => {
                    let message = result.unwrap_or(reason.clone());
                    trace.append(reason, "task_complete", message.clone());
                    return Ok((TaskOutcome::Complete { message }, trace));
                }
                ReasonDecision::Blocked { reason } => {
                    trace.append(reason.clone(), "task_blocked", reason.clone());
                    return Ok((TaskOutcome::Blocked { reason }, trace));
                }
                ReasonDecision::Do { intent, rationale } => {
                    self.act(description, &intent, &rationale, &mut trace).await;
                }
                ReasonDecision::NoDecision => {
                    // iteration consumed without acting; try again next loop
                }
            }
        }

        let reason = "max iterations reached".to_string();
        trace.append(reason.clone(), "task_blocked", reason.clone());
        Ok((TaskOutcome::Blocked { reason }, trace))
    }

    async fn reason(&self, description: &str, trace: &TraceLog) -> ReasonDecision {
        let prompt = match self.renderer.render(
            names::REASONING,
            &json!({
                "task_description": description,
                "trace": trace_for_template(trace),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
        ) {
            Ok(p) => p,
            Err(e) => {
                error!("failed to render reasoning template: {}", e);
                return ReasonDecision::NoDecision;
            }
        };

        let response = match self
            .llm
            .complete(
                vec![Message::user(prompt)],
                tools::reasoning_tools(),
                ToolChoice::Auto,
                GenerationOptions::default(),
            )
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("reasoning LLM call failed: {}", e);
                return ReasonDecision::NoDecision;
            }
        };

        let Some(choice) = response.choices.into_iter().next() else {
            warn!("reasoning phase returned no choices");
            return ReasonDecision::NoDecision;
        };

        let Some(call) = choice.message.tool_calls.and_then(|mut calls| calls.drain(..).next()) else {
            return ReasonDecision::NoDecision;
        };

        let args: serde_json::Value = match serde_json::from_str(&call.function.arguments) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to parse reasoning tool call arguments: {}", e);
                return ReasonDecision::NoDecision;
            }
        };

        match call.function.name.as_str() {
            "task_complete" => ReasonDecision::Complete {
                reason: args.get("reason").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                result: args.get("result").and_then(|v| v.as_str()).map(str::to_string),
            },
            "task_blocked" => ReasonDecision::Blocked {
                reason: args.get("reason").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            },
            "do" => ReasonDecision::Do {
                intent: args.get("intent").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                rationale: args.get("rationale").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            },
            other => {
                warn!("reasoning phase called unknown function '{}'", other);
                ReasonDecision::NoDecision
            }
        }
    }

    async fn act(&self, description: &str, intent: &str, rationale: &str, trace: &mut TraceLog) {
        let candidates: Vec<_> = match self.store.query_by_text(intent, DEFAULT_CANDIDATE_COUNT, None).await {
            Ok(hits) => hits
                .into_iter()
                .filter(|hit| hit.similarity >= self.match_threshold)
                .collect(),
            Err(e) => {
                warn!("intent store query failed: {}", e);
                Vec::new()
            }
        };

        if candidates.is_empty() {
            trace.append(rationale, intent, "no candidates");
            return;
        }

        let options_json: Vec<serde_json::Value> = candidates
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "text": c.text,
                    "metadata": c.metadata,
                    "similarity": c.similarity,
                })
            })
            .collect();

        let prompt = match self.renderer.render(
            names::ACTION,
            &json!({
                "task_description": description,
                "current_intent": intent,
                "intent_rationale": rationale,
                "options": options_json,
                "trace": trace_for_template(trace),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
        ) {
            Ok(p) => p,
            Err(e) => {
                error!("failed to render action template: {}", e);
                trace.append(rationale, intent, format!("failed to render action prompt: {}", e));
                return;
            }
        };

        let response = match self
            .llm
            .complete(
                vec![Message::user(prompt)],
                tools::action_tools(),
                ToolChoice::Required,
                GenerationOptions::default(),
            )
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("action LLM call failed: {}", e);
                trace.append(rationale, intent, format!("action LLM call failed: {}", e));
                return;
            }
        };

        let Some(choice) = response.choices.into_iter().next() else {
            trace.append(rationale, intent, "action phase returned no choices");
            return;
        };

        let Some(call) = choice.message.tool_calls.and_then(|mut calls| calls.drain(..).next()) else {
            trace.append(rationale, intent, "action phase returned no tool call");
            return;
        };

        let args: serde_json::Value = match serde_json::from_str(&call.function.arguments) {
            Ok(v) => v,
            Err(e) => {
                trace.append(rationale, intent, format!("failed to parse action arguments: {}", e));
                return;
            }
        };

        match call.function.name.as_str() {
            "execute_tool" => self.execute_tool(rationale, &args, trace).await,
            "refine_intent" => {
                let intent_id = args.get("intent_id").and_then(|v| v.as_str()).unwrap_or("");
                let explanation = args.get("explanation").and_then(|v| v.as_str()).unwrap_or("");
                let refined_text = candidates
                    .iter()
                    .find(|c| c.id == intent_id)
                    .map(|c| c.text.clone())
                    .unwrap_or_default();
                trace.append(
                    rationale,
                    "REFINE_INTENT",
                    format!("{} | {}", refined_text, explanation),
                );
            }
            "insufficient_information" => {
                let missing = args.get("missing").and_then(|v| v.as_str()).unwrap_or("");
                trace.append(rationale, intent, format!("insufficient information: {}", missing));
            }
            "no_suitable_tool" => {
                let reason = args.get("reason").and_then(|v| v.as_str()).unwrap_or("");
                trace.append(rationale, intent, format!("no suitable tool: {}", reason));
            }
            other => {
                trace.append(rationale, intent, format!("action phase called unknown function '{}'", other));
            }
        }
    }

    async fn execute_tool(&self, rationale: &str, args: &serde_json::Value, trace: &mut TraceLog) {
        let Some(tool_uri) = args.get("tool_uri").and_then(|v| v.as_str()) else {
            trace.append(rationale, "EXECUTE_TOOL", "missing 'tool_uri' argument");
            return;
        };
        let arguments = args.get("arguments").cloned().unwrap_or(json!({}));

        let (server, tool) = match parse_tool_uri(tool_uri) {
            Ok(parts) => parts,
            Err(e) => {
                trace.append(rationale, format!("EXECUTE_TOOL: {}", tool_uri), e.to_string());
                return;
            }
        };

        match self.host.call_tool(server, tool, arguments).await {
            Ok(result) => {
                trace.append(rationale, format!("EXECUTE_TOOL: {}", tool_uri), result.to_trace_string());
            }
            Err(e) => {
                trace.append(rationale, format!("EXECUTE_TOOL: {}", tool_uri), e.to_string());
            }
        }
    }
}

enum ReasonDecision {
    Complete { reason: String, result: Option<String> },
    Blocked { reason: String },
    Do { intent: String, rationale: String },
    NoDecision,
}

fn trace_for_template(trace: &TraceLog) -> Vec<serde_json::Value> {
    trace
        .snapshot()
        .iter()
        .map(|e| {
            json!({
                "timestamp": e.timestamp.to_rfc3339(),
                "reasoning": e.reasoning,
                "action": e.action,
                "result": e.result,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityHost, CapabilitySession, ToolDescriptor, ToolResult};
    use crate::intent::{InMemoryIntentStore, IntentStore};
    use crate::llm::{AssistantToolCall, ChatCompletionResponse, Choice, FunctionCall, Role, ToolDefinition};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// A queue-driven [`LlmClient`] stub: each call pops the next scripted
    /// response, regardless of the prompt or tool list passed in.
    struct ScriptedLlm {
        responses: Mutex<std::collections::VecDeque<ChatCompletionResponse>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<ChatCompletionResponse>) -> Arc<Self> {
            Arc::new(ScriptedLlm {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            _messages: Vec<Message>,
            _tools: Vec<ToolDefinition>,
            _tool_choice: ToolChoice,
            _options: GenerationOptions,
        ) -> Result<ChatCompletionResponse> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| crate::error::Error::LlmTransport("scripted responses exhausted".to_string()))
        }
    }

    fn call_response(name: &str, arguments: serde_json::Value) -> ChatCompletionResponse {
        ChatCompletionResponse {
            id: "test".to_string(),
            model: "test".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message {
                    role: Role::Assistant,
                    content: String::new(),
                    name: None,
                    tool_call_id: None,
                    tool_calls: Some(vec![AssistantToolCall {
                        id: "call_1".to_string(),
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: name.to_string(),
                            arguments: arguments.to_string(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: None,
        }
    }

    struct StubEmbed;

    #[async_trait]
    impl crate::intent::EmbeddingFn for StubEmbed {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0_f32; 8];
            for (i, b) in text.bytes().enumerate() {
                v[i % 8] += b as f32;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    async fn empty_store() -> Arc<dyn IntentStore> {
        let dir = tempdir().unwrap();
        Arc::new(
            InMemoryIntentStore::open(dir.path(), "test", Arc::new(StubEmbed))
                .await
                .unwrap(),
        )
    }

    fn empty_host() -> Arc<CapabilityHost> {
        Arc::new(CapabilityHost::with_sessions(Vec::new()))
    }

    fn renderer() -> Arc<PromptRenderer> {
        Arc::new(PromptRenderer::new().unwrap())
    }

    /// S1: immediate completion with no tool dispatch at all.
    #[tokio::test]
    async fn immediate_completion_produces_single_trace_entry() {
        let llm = ScriptedLlm::new(vec![call_response(
            "task_complete",
            json!({"reason": "no action required"}),
        )]);
        let loop_ = CognitiveLoop::new(llm, empty_store().await, empty_host(), renderer(), 0.75);

        let (outcome, trace) = loop_.run_task("Say hello.", 10).await.unwrap();

        assert_eq!(outcome, TaskOutcome::Complete { message: "no action required".to_string() });
        assert_eq!(trace.snapshot().len(), 1);
        assert_eq!(trace.snapshot()[0].action, "task_complete");
    }

    /// S2: a single tool dispatch round-trips through a fake capability
    /// session and reaches COMPLETE on the following reasoning call.
    #[tokio::test]
    async fn single_tool_dispatch_invokes_host_and_completes() {
        struct FakeMailSession {
            called: Mutex<Vec<(String, serde_json::Value)>>,
        }

        #[async_trait]
        impl CapabilitySession for FakeMailSession {
            fn server_name(&self) -> &str {
                "mail"
            }

            async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
                Ok(vec![ToolDescriptor {
                    server_name: "mail".to_string(),
                    tool_name: "send_email".to_string(),
                    description: "send an email".to_string(),
                    input_schema: json!({}),
                }])
            }

            async fn call_tool(&self, tool_name: &str, arguments: serde_json::Value) -> Result<ToolResult> {
                self.called.lock().unwrap().push((tool_name.to_string(), arguments));
                Ok(ToolResult { content: json!({"status": "sent"}), is_error: false })
            }

            async fn close(&self) -> Result<()> {
                Ok(())
            }
        }

        let host = Arc::new(CapabilityHost::with_sessions(vec![Box::new(FakeMailSession {
            called: Mutex::new(Vec::new()),
        })]));

        let store = empty_store().await;
        store
            .put_item(
                "intent::L1::mail::send_email",
                "send an email to a colleague",
                BTreeMap::new(),
            )
            .await
            .unwrap();

        let llm = ScriptedLlm::new(vec![
            call_response(
                "do",
                json!({"intent": "send an email to a colleague", "rationale": "user asked"}),
            ),
            call_response(
                "execute_tool",
                json!({
                    "tool_uri": "tool::mail::send_email",
                    "arguments": {"to": "alice@x", "subject": "lunch", "body": "..."}
                }),
            ),
            call_response("task_complete", json!({"reason": "email sent"})),
        ]);

        let loop_ = CognitiveLoop::new(llm, store, host, renderer(), 0.0);
        let (outcome, trace) = loop_.run_task("Email alice@x about lunch.", 10).await.unwrap();

        assert_eq!(outcome, TaskOutcome::Complete { message: "email sent".to_string() });
        let entries = trace.snapshot();
        let dispatch = entries
            .iter()
            .find(|e| e.action == "EXECUTE_TOOL: tool::mail::send_email")
            .expect("execute_tool entry recorded");
        assert!(dispatch.result.contains("sent"));
        assert!(entries.iter().any(|e| e.action == "task_complete"));
    }

    /// S4: an unknown server in the tool URI is recorded and the loop
    /// continues rather than ever calling the host.
    #[tokio::test]
    async fn unknown_server_uri_is_recorded_and_loop_continues() {
        let store = empty_store().await;
        store
            .put_item("intent::L1::mail::send", "send an email", BTreeMap::new())
            .await
            .unwrap();

        let llm = ScriptedLlm::new(vec![
            call_response("do", json!({"intent": "send an email", "rationale": "r"})),
            call_response("execute_tool", json!({"tool_uri": "tool::ghost::noop", "arguments": {}})),
            call_response("task_blocked", json!({"reason": "cannot proceed"})),
        ]);

        let loop_ = CognitiveLoop::new(llm, store, empty_host(), renderer(), 0.0);
        let (outcome, trace) = loop_.run_task("do something", 10).await.unwrap();

        assert_eq!(outcome, TaskOutcome::Blocked { reason: "cannot proceed".to_string() });
        let entries = trace.snapshot();
        assert!(entries
            .iter()
            .any(|e| e.action.starts_with("EXECUTE_TOOL: tool::ghost::noop") && e.result.contains("unknown")));
    }

    /// S6 / I5 / I6: a `do` that never finds a candidate exhausts the
    /// iteration budget and still returns a terminal state within the
    /// trace-length bound.
    #[tokio::test]
    async fn exhausted_budget_with_no_candidates_returns_blocked() {
        let responses = (0..3)
            .map(|_| call_response("do", json!({"intent": "x", "rationale": "r"})))
            .collect();
        let llm = ScriptedLlm::new(responses);

        let loop_ = CognitiveLoop::new(llm, empty_store().await, empty_host(), renderer(), 0.75);
        let (outcome, trace) = loop_.run_task("do x", 3).await.unwrap();

        assert_eq!(outcome, TaskOutcome::Blocked { reason: "max iterations reached".to_string() });
        let entries = trace.snapshot();
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().filter(|e| e.result == "no candidates").count() == 3);
        assert!(entries.len() as u32 <= 3 * 2);
    }

    /// Boundary: `max_iterations = 0` returns BLOCKED without any LLM call.
    #[tokio::test]
    async fn zero_max_iterations_blocks_without_calling_llm() {
        let llm = ScriptedLlm::new(Vec::new());
        let loop_ = CognitiveLoop::new(llm, empty_store().await, empty_host(), renderer(), 0.75);

        let (outcome, trace) = loop_.run_task("anything", 0).await.unwrap();

        assert_eq!(outcome, TaskOutcome::Blocked { reason: "max iterations reached".to_string() });
        assert_eq!(trace.snapshot().len(), 1);
    }
}
