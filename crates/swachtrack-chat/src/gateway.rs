//! Model gateway: the one seam to the hosted chat-completion service.
//!
//! [`OpenAiCompatibleGateway`] speaks the OpenAI `/chat/completions` wire
//! format over reqwest. [`MockGateway`] replays scripted replies and records
//! every request for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use swachtrack_core::config::LlmConfig;
use swachtrack_core::types::{Message, Role, ToolInvocation};

use crate::error::ChatError;

/// Longest slice of an upstream error body carried into error messages.
const MAX_ERROR_BODY: usize = 500;

// =============================================================================
// Request / response model
// =============================================================================

/// A function the model may ask to call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the argument object.
    pub parameters: Value,
}

/// Structured-output constraint (`response_format.type = "json_schema"`).
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: Value,
}

/// Everything one outbound call needs apart from the model name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub response_format: Option<ResponseFormat>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Concatenated text of every user turn, mainly for assertions.
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A tool call as emitted by the model, arguments still JSON-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    /// Decode the argument string into a [`ToolInvocation`].
    ///
    /// An empty string decodes to an empty argument map.
    pub fn parse(&self) -> Result<ToolInvocation, ChatError> {
        let raw = if self.arguments.trim().is_empty() {
            "{}"
        } else {
            self.arguments.as_str()
        };
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ChatError::InvalidToolArguments(e.to_string()))?;
        match value {
            Value::Object(arguments) => Ok(ToolInvocation {
                name: self.name.clone(),
                arguments,
            }),
            other => Err(ChatError::InvalidToolArguments(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }
}

/// The assistant message returned by the gateway.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantMessage {
    pub content: Option<String>,
    pub tool_call: Option<ToolCall>,
}

impl AssistantMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_call: None,
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: None,
            tool_call: Some(ToolCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }

    /// Content with surrounding whitespace removed, or `None` if blank.
    pub fn trimmed_content(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Remote chat-completion service.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<AssistantMessage, ChatError>;
}

// =============================================================================
// OpenAI-compatible HTTP gateway
// =============================================================================

/// Gateway for any endpoint following the OpenAI chat completions format.
pub struct OpenAiCompatibleGateway {
    chat_url: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl OpenAiCompatibleGateway {
    pub fn new(config: &LlmConfig) -> Result<Self, ChatError> {
        let base_url = config.base_url.trim_end_matches('/');
        let chat_url = if base_url.ends_with("chat/completions") {
            base_url.to_string()
        } else {
            format!("{base_url}/chat/completions")
        };

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            chat_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> WireRequest<'a> {
        WireRequest {
            model: &self.model,
            messages: wire_messages(&request.messages),
            tools: request
                .tools
                .iter()
                .map(|t| WireTool {
                    kind: "function",
                    function: WireFunction {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
            tool_choice: if request.tools.is_empty() {
                None
            } else {
                Some("auto")
            },
            response_format: request.response_format.as_ref().map(|f| WireResponseFormat {
                kind: "json_schema",
                json_schema: WireJsonSchema {
                    name: &f.name,
                    schema: &f.schema,
                },
            }),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl ModelGateway for OpenAiCompatibleGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<AssistantMessage, ChatError> {
        let body = self.build_body(&request);
        tracing::debug!(
            url = %self.chat_url,
            model = %self.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "Sending chat completion request"
        );

        let mut req = self.client.post(&self.chat_url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ChatError::Upstream(format!("chat completions request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream(format!(
                "chat completions returned {}: {}",
                status,
                truncate(&text, MAX_ERROR_BODY)
            )));
        }

        let parsed: WireResponse = response.json().await.map_err(|e| {
            ChatError::Upstream(format!("chat completions JSON decode failed: {e}"))
        })?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ChatError::Upstream("no choices in chat completion".to_string()))?;

        Ok(message.into_assistant())
    }
}

/// Tool turns are dropped: the transcript does not track tool-call ids, and
/// OpenAI-compatible servers reject `tool` messages without them.
fn wire_messages(messages: &[Message]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .filter(|m| m.role != Role::Tool)
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect()
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Serialize)]
struct WireResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: WireJsonSchema<'a>,
}

#[derive(Debug, Serialize)]
struct WireJsonSchema<'a> {
    name: &'a str,
    schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
    /// Legacy `functions` API field, still emitted by some servers.
    #[serde(default)]
    function_call: Option<WireFunctionCall>,
}

impl WireResponseMessage {
    fn into_assistant(self) -> AssistantMessage {
        let call = self
            .tool_calls
            .and_then(|calls| calls.into_iter().next().map(|c| c.function))
            .or(self.function_call);
        AssistantMessage {
            content: self.content,
            tool_call: call.map(|f| ToolCall {
                name: f.name,
                arguments: f.arguments.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

// =============================================================================
// MockGateway
// =============================================================================

/// Scripted gateway for tests.
///
/// Replies are consumed in order; once the script runs out the fallback
/// reply (if any) is returned on every call. All requests are recorded.
#[derive(Default)]
pub struct MockGateway {
    script: Mutex<VecDeque<Result<AssistantMessage, String>>>,
    fallback: Option<AssistantMessage>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that answers every call with the same message.
    pub fn repeating(reply: AssistantMessage) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }

    pub fn push(&self, reply: AssistantMessage) -> &Self {
        self.lock_script().push_back(Ok(reply));
        self
    }

    pub fn push_text(&self, content: impl Into<String>) -> &Self {
        self.push(AssistantMessage::text(content))
    }

    pub fn push_json(&self, value: &Value) -> &Self {
        self.push_text(value.to_string())
    }

    pub fn push_tool_call(&self, name: &str, arguments: &Value) -> &Self {
        self.push(AssistantMessage::tool_call(name, arguments.to_string()))
    }

    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.lock_script().push_back(Err(message.into()));
        self
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(r) => r.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<AssistantMessage, String>>> {
        match self.script.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<AssistantMessage, ChatError> {
        match self.requests.lock() {
            Ok(mut r) => r.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }

        match self.lock_script().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ChatError::Upstream(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ChatError::Upstream("mock gateway script exhausted".to_string())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
