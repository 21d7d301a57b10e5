//! Chat orchestrator: multi-turn sessions with model-driven tool dispatch.
//!
//! A turn appends the user message, asks the model for a reply with the tool
//! catalog attached, and if the model calls a tool runs the matching
//! pipeline step and renders its result as the reply.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;

use swachtrack_core::config::LlmConfig;
use swachtrack_core::types::{Message, Role, ToolName};

use crate::error::ChatError;
use crate::gateway::{CompletionRequest, ModelGateway, ToolCall, ToolSpec};
use crate::pipeline::Pipeline;
use crate::prompts;
use crate::response;
use crate::session::SessionStore;

const SESSION_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// One inbound chat message.
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    pub message: String,
    pub session_id: Option<String>,
    /// Client-held transcript, used only to seed a session the store does
    /// not know (new or evicted).
    pub history: Vec<Message>,
}

/// Result of a chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub reply: String,
    pub session_id: String,
    /// Full transcript without system turns.
    pub transcript: Vec<Message>,
    pub report_id: Option<String>,
    pub next_steps: Option<Vec<String>>,
}

/// Outcome of resolving a tool call.
enum Dispatch {
    Completed {
        result_json: String,
        reply: String,
        report: Option<(String, Vec<String>)>,
    },
    UnknownTool(ChatError),
    Failed(ChatError),
}

/// Central chat coordinator.
pub struct ChatOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    pipeline: Pipeline,
    store: Arc<dyn SessionStore>,
    tools: Vec<ToolSpec>,
    temperature: f64,
    max_tokens: u32,
}

impl ChatOrchestrator {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        store: Arc<dyn SessionStore>,
        config: &LlmConfig,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(Arc::clone(&gateway)),
            gateway,
            store,
            tools: prompts::tool_catalog(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Handle one user message.
    ///
    /// Tool failures degrade into an apology reply. Only a failed first
    /// model call (or a session store fault) is returned as an error, and
    /// in that case the stored transcript is left untouched.
    pub async fn handle_message(&self, turn: ChatTurn) -> Result<ChatOutcome, ChatError> {
        if turn.message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let session_id = turn
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_session_id);

        let (session, created) = self.store.load(&session_id)?;
        let mut messages = session.messages;
        if created && !turn.history.is_empty() {
            let seeded = turn
                .history
                .into_iter()
                .filter(|m| m.role != Role::System)
                .collect::<Vec<_>>();
            tracing::debug!(session_id = %session_id, turns = seeded.len(), "Seeding session from client history");
            messages.extend(seeded);
        }

        tracing::info!(session_id = %session_id, new_session = created, "Chat message received");
        messages.push(Message::now(Role::User, turn.message));

        let request = CompletionRequest {
            messages: messages.clone(),
            tools: self.tools.clone(),
            response_format: None,
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };
        let assistant = match self.gateway.complete(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Chat model call failed");
                return Err(e);
            }
        };

        let mut report_id = None;
        let mut next_steps = None;

        let reply = match &assistant.tool_call {
            None => assistant
                .trimmed_content()
                .map(str::to_string)
                .unwrap_or_else(|| response::DEFAULT_GREETING.to_string()),
            Some(call) => match self.dispatch(call).await {
                Dispatch::Completed {
                    result_json,
                    reply,
                    report,
                } => {
                    messages.push(Message::now(
                        Role::Assistant,
                        assistant.content.clone().unwrap_or_default(),
                    ));
                    messages.push(Message::now(Role::Tool, result_json));
                    if let Some((id, steps)) = report {
                        report_id = Some(id);
                        next_steps = Some(steps);
                    }
                    reply
                }
                Dispatch::UnknownTool(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "Tool call not dispatched");
                    response::UNKNOWN_TOOL_REPLY.to_string()
                }
                Dispatch::Failed(e) => {
                    tracing::error!(session_id = %session_id, tool = %call.name, error = %e, "Tool dispatch failed");
                    response::DISPATCH_FAILURE_REPLY.to_string()
                }
            },
        };

        messages.push(Message::now(Role::Assistant, reply.clone()));
        self.store.put(&session_id, messages.clone())?;

        let transcript = messages
            .into_iter()
            .filter(|m| m.role != Role::System)
            .collect();

        Ok(ChatOutcome {
            reply,
            session_id,
            transcript,
            report_id,
            next_steps,
        })
    }

    async fn dispatch(&self, call: &ToolCall) -> Dispatch {
        let Some(tool) = ToolName::parse(&call.name) else {
            return Dispatch::UnknownTool(ChatError::UnknownTool(call.name.clone()));
        };
        tracing::info!(tool = tool.as_str(), "Dispatching tool call");

        match self.run_tool(tool, call).await {
            Ok(done) => done,
            Err(e) => Dispatch::Failed(e),
        }
    }

    async fn run_tool(&self, tool: ToolName, call: &ToolCall) -> Result<Dispatch, ChatError> {
        let invocation = call.parse()?;
        let mut args = Vec::with_capacity(4);
        for key in prompts::required_arguments(tool) {
            let value = invocation.argument(key).ok_or_else(|| {
                ChatError::InvalidToolArguments(format!("{} requires {}", tool.as_str(), key))
            })?;
            args.push(value);
        }

        let done = match tool {
            ToolName::ClassifyIssue => {
                let result = self.pipeline.classify(args[0]).await?;
                Dispatch::Completed {
                    result_json: tool_result_json(&result)?,
                    reply: response::classification_reply(&result),
                    report: None,
                }
            }
            ToolName::AnalyzeIssue => {
                let result = self
                    .pipeline
                    .analyze(args[0], args[1], args[2], args[3])
                    .await?;
                Dispatch::Completed {
                    result_json: tool_result_json(&result)?,
                    reply: response::analysis_reply(&result),
                    report: None,
                }
            }
            ToolName::CreateReport => {
                let report = self.pipeline.report(args[0]).await?;
                Dispatch::Completed {
                    result_json: tool_result_json(&report)?,
                    reply: response::report_reply(&report),
                    report: Some((report.report_id.clone(), report.next_steps.clone())),
                }
            }
        };
        Ok(done)
    }
}

/// Body of the tool-result turn.
fn tool_result_json<T: Serialize>(result: &T) -> Result<String, ChatError> {
    serde_json::to_string(result)
        .map_err(|e| ChatError::MalformedOutput(format!("tool result not serializable: {e}")))
}

/// `session_<unix millis>_<9 base36 chars>`. Unique enough for a single
/// process; not collision-proof.
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::gateway::{AssistantMessage, MockGateway};
    use crate::session::InMemorySessionStore;

    struct Harness {
        mock: Arc<MockGateway>,
        store: Arc<InMemorySessionStore>,
        orch: ChatOrchestrator,
    }

    fn harness() -> Harness {
        let mock = Arc::new(MockGateway::new());
        let store = Arc::new(InMemorySessionStore::new(
            prompts::ASSISTANT_SYSTEM_PROMPT,
            100,
            Duration::from_secs(600),
        ));
        let orch = ChatOrchestrator::new(mock.clone(), store.clone(), &LlmConfig::default());
        Harness { mock, store, orch }
    }

    fn turn(message: &str, session_id: Option<&str>) -> ChatTurn {
        ChatTurn {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
            history: Vec::new(),
        }
    }

    fn classification_json() -> serde_json::Value {
        json!({
            "issue": "streetlight broken near park",
            "category": "streetlights",
            "location": "Lodhi Garden, Delhi",
            "severity_indicators": "dark path, safety risk at night"
        })
    }

    fn analysis_json() -> serde_json::Value {
        json!({
            "time_estimate": "1 day",
            "cost_estimate": "₹8,000",
            "manpower_required": "2 electricians",
            "recommended_company": "NDMC Electrical Wing",
            "severity": "medium",
            "summary": "Replace the lamp."
        })
    }

    fn roles(messages: &[Message]) -> Vec<Role> {
        messages.iter().map(|m| m.role).collect()
    }

    // ---- Session handling ----

    #[test]
    fn test_generate_session_id_format() {
        let id = generate_session_id();
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SESSION_SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let h = harness();
        let err = h.orch.handle_message(turn("  ", None)).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        assert_eq!(h.mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_direct_reply_creates_session() {
        let h = harness();
        h.mock.push_text("Can you tell me where the pothole is?");

        let out = h
            .orch
            .handle_message(turn("There's a pothole on MG Road", None))
            .await
            .unwrap();

        assert!(out.session_id.starts_with("session_"));
        assert_eq!(out.reply, "Can you tell me where the pothole is?");
        assert_eq!(roles(&out.transcript), vec![Role::User, Role::Assistant]);
        assert!(out.report_id.is_none());
        assert!(out.next_steps.is_none());
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_transcript_and_tools() {
        let h = harness();
        h.mock.push_text("ok");
        h.orch.handle_message(turn("hello", None)).await.unwrap();

        let request = &h.mock.requests()[0];
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, prompts::ASSISTANT_SYSTEM_PROMPT);
        assert_eq!(request.messages.last().unwrap().content, "hello");
        assert_eq!(request.tools.len(), 3);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(1000));
        assert!(request.response_format.is_none());
    }

    #[tokio::test]
    async fn test_second_turn_continues_transcript() {
        let h = harness();
        h.mock.push_text("Where exactly?").push_text("Thanks, noted.");

        let first = h
            .orch
            .handle_message(turn("There's a pothole on MG Road", None))
            .await
            .unwrap();
        let second = h
            .orch
            .handle_message(turn("Near the metro station", Some(&first.session_id)))
            .await
            .unwrap();

        assert_eq!(second.session_id, first.session_id);
        assert!(second.transcript.len() >= first.transcript.len() + 2);
        assert_eq!(second.transcript[0].content, "There's a pothole on MG Road");

        // The second model call sees the earlier turns.
        let request = &h.mock.requests()[1];
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[2].content, "Where exactly?");
    }

    #[tokio::test]
    async fn test_blank_session_id_is_replaced() {
        let h = harness();
        h.mock.push_text("hi");
        let out = h.orch.handle_message(turn("hello", Some(""))).await.unwrap();
        assert!(out.session_id.starts_with("session_"));
    }

    #[tokio::test]
    async fn test_client_supplied_session_id_is_kept() {
        let h = harness();
        h.mock.push_text("hi");
        let out = h
            .orch
            .handle_message(turn("hello", Some("my-session")))
            .await
            .unwrap();
        assert_eq!(out.session_id, "my-session");
    }

    #[tokio::test]
    async fn test_missing_content_uses_greeting() {
        let h = harness();
        h.mock.push(AssistantMessage::default());
        let out = h.orch.handle_message(turn("hello", None)).await.unwrap();
        assert_eq!(out.reply, response::DEFAULT_GREETING);
    }

    #[tokio::test]
    async fn test_history_seeds_unknown_session_only() {
        let h = harness();
        h.mock.push_text("welcome back").push_text("still here");

        let history = vec![
            Message::system("ignored"),
            Message::new(Role::User, "earlier question"),
            Message::new(Role::Assistant, "earlier answer"),
        ];
        let out = h
            .orch
            .handle_message(ChatTurn {
                message: "follow up".to_string(),
                session_id: Some("restored".to_string()),
                history: history.clone(),
            })
            .await
            .unwrap();
        assert_eq!(out.transcript.len(), 4);
        assert_eq!(out.transcript[0].content, "earlier question");
        let sent = &h.mock.requests()[0].messages;
        assert_eq!(sent.iter().filter(|m| m.role == Role::System).count(), 1);

        // Known session: client history is ignored.
        let again = h
            .orch
            .handle_message(ChatTurn {
                message: "one more".to_string(),
                session_id: Some("restored".to_string()),
                history,
            })
            .await
            .unwrap();
        assert_eq!(again.transcript.len(), 6);
    }

    #[tokio::test]
    async fn test_upstream_failure_leaves_transcript_untouched() {
        let h = harness();
        h.mock.push_text("first reply").push_error("503 service unavailable");

        let first = h.orch.handle_message(turn("hello", None)).await.unwrap();
        let err = h
            .orch
            .handle_message(turn("again", Some(&first.session_id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Upstream(_)));

        let (session, _) = h.store.load(&first.session_id).unwrap();
        assert_eq!(session.messages.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_first_turn_leaves_session_unseen() {
        let h = harness();
        h.mock.push_error("503 service unavailable").push_text("welcome back");

        let seeded_turn = || ChatTurn {
            message: "follow up".to_string(),
            session_id: Some("restored".to_string()),
            history: vec![
                Message::new(Role::User, "earlier question"),
                Message::new(Role::Assistant, "earlier answer"),
            ],
        };

        let err = h.orch.handle_message(seeded_turn()).await.unwrap_err();
        assert!(matches!(err, ChatError::Upstream(_)));
        assert!(h.store.is_empty());

        // The retry still counts as a new session, so the history seeds it.
        let out = h.orch.handle_message(seeded_turn()).await.unwrap();
        assert_eq!(out.transcript.len(), 4);
        assert_eq!(out.transcript[0].content, "earlier question");
        assert_eq!(out.transcript[2].content, "follow up");
    }

    #[test]
    fn test_tool_result_json_reports_serialization_failure() {
        use std::collections::HashMap;

        let mut unserializable = HashMap::new();
        unserializable.insert((1, 2), "non-string map key");
        let err = tool_result_json(&unserializable).unwrap_err();
        assert!(matches!(err, ChatError::MalformedOutput(_)));

        let ok = tool_result_json(&json!({"category": "potholes"})).unwrap();
        assert_eq!(ok, r#"{"category":"potholes"}"#);
    }

    // ---- Tool dispatch ----

    #[tokio::test]
    async fn test_create_report_tool_surfaces_report_fields() {
        let h = harness();
        h.mock
            .push_tool_call(
                "create_report",
                &json!({"issue_description": "streetlight broken near park"}),
            )
            .push_json(&classification_json())
            .push_json(&analysis_json());

        let out = h
            .orch
            .handle_message(turn("streetlight broken near park, please report it", None))
            .await
            .unwrap();

        let report_id = out.report_id.clone().unwrap();
        assert!(report_id.starts_with("RPT-"));
        assert_eq!(out.next_steps.clone().unwrap().len(), 4);
        assert!(out.reply.contains(&report_id));
        assert!(out.reply.contains("Report Created Successfully"));

        assert_eq!(
            roles(&out.transcript),
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        let tool_result: serde_json::Value =
            serde_json::from_str(&out.transcript[2].content).unwrap();
        assert_eq!(tool_result["report_id"], report_id.as_str());

        // Classify step receives the tool argument as its user turn.
        let requests = h.mock.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].user_text(), "streetlight broken near park");
    }

    #[tokio::test]
    async fn test_classify_tool_reply() {
        let h = harness();
        h.mock
            .push_tool_call("classify_issue", &json!({"issue_description": "dark street"}))
            .push_json(&classification_json());

        let out = h.orch.handle_message(turn("dark street", None)).await.unwrap();
        assert!(out.reply.contains("**streetlights** in **Lodhi Garden, Delhi**"));
        assert!(out.report_id.is_none());
    }

    #[tokio::test]
    async fn test_analyze_tool_reply() {
        let h = harness();
        h.mock
            .push_tool_call(
                "analyze_issue",
                &json!({
                    "issue": "dark street",
                    "category": "streetlights",
                    "location": "Lodhi Garden",
                    "severity_indicators": "night safety"
                }),
            )
            .push_json(&analysis_json());

        let out = h.orch.handle_message(turn("analyze it", None)).await.unwrap();
        assert!(out.reply.contains("**Cost Estimate:** ₹8,000"));
        assert!(h.mock.requests()[1].user_text().contains("Location: Lodhi Garden"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_dispatched() {
        let h = harness();
        h.mock.push_tool_call("order_pizza", &json!({"size": "large"}));

        let out = h.orch.handle_message(turn("hungry", None)).await.unwrap();
        assert_eq!(out.reply, response::UNKNOWN_TOOL_REPLY);
        assert_eq!(h.mock.call_count(), 1);
        assert_eq!(roles(&out.transcript), vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_missing_tool_argument_degrades_to_apology() {
        let h = harness();
        h.mock.push_tool_call("analyze_issue", &json!({"issue": "pothole"}));

        let out = h.orch.handle_message(turn("analyze", None)).await.unwrap();
        assert_eq!(out.reply, response::DISPATCH_FAILURE_REPLY);
        assert_eq!(h.mock.call_count(), 1);
        assert_eq!(roles(&out.transcript), vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_malformed_tool_arguments_degrade_to_apology() {
        let h = harness();
        h.mock
            .push(AssistantMessage::tool_call("create_report", "{\"issue_description\": "));

        let out = h.orch.handle_message(turn("report", None)).await.unwrap();
        assert_eq!(out.reply, response::DISPATCH_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn test_failing_step_degrades_and_skips_tool_turns() {
        let h = harness();
        h.mock
            .push_tool_call("create_report", &json!({"issue_description": "pothole"}))
            .push_error("upstream exploded");

        let out = h.orch.handle_message(turn("report pothole", None)).await.unwrap();
        assert_eq!(out.reply, response::DISPATCH_FAILURE_REPLY);
        assert!(out.report_id.is_none());
        assert!(out.transcript.iter().all(|m| m.role != Role::Tool));

        let (session, _) = h.store.load(&out.session_id).unwrap();
        assert_eq!(roles(&session.messages), vec![Role::System, Role::User, Role::Assistant]);
    }
}
