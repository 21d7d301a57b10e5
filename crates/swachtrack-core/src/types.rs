use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Conversation
// =============================================================================

/// Author of a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Fixed instruction that opens every session.
    System,
    /// Citizen turn.
    User,
    /// Model or orchestrator reply.
    Assistant,
    /// Result of a locally executed tool. Older clients send `function`.
    #[serde(alias = "function")]
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A single transcript entry. Immutable once appended to a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// A message without a timestamp (used for the system prompt).
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    /// A message stamped with the current time.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A client-identified conversation thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
}

// =============================================================================
// Pipeline results
// =============================================================================

/// Output of the classify step.
///
/// `category` is whatever label the model chose; it is not checked against
/// [`CATEGORIES`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub issue: String,
    pub category: String,
    pub location: String,
    pub severity_indicators: String,
}

/// Output of the analyze step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub time_estimate: String,
    pub cost_estimate: String,
    pub manpower_required: String,
    pub recommended_company: String,
    pub severity: String,
    pub summary: String,
}

/// Composed classification + analysis. Never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_id: String,
    pub timestamp: DateTime<Utc>,
    pub original_issue: String,
    pub classification: ClassificationResult,
    pub analysis: AnalysisResult,
    pub status: String,
    pub next_steps: Vec<String>,
}

/// Category labels offered to the classifier.
pub const CATEGORIES: [&str; 8] = [
    "streetlights",
    "potholes",
    "overflowing dustbins",
    "water logging",
    "roadblocks",
    "broken footpaths",
    "garbage dumping",
    "other civic issues",
];

/// Status stamped on every composed report.
pub const REPORT_STATUS: &str = "processed";

/// Fixed follow-up list attached to every report, in order.
pub const NEXT_STEPS: [&str; 4] = [
    "Forward to municipal department",
    "Assign to recommended contractor",
    "Schedule repair work",
    "Monitor progress",
];

// =============================================================================
// Tool calls
// =============================================================================

/// Tools the dialogue orchestrator knows how to execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolName {
    ClassifyIssue,
    AnalyzeIssue,
    CreateReport,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::ClassifyIssue,
        ToolName::AnalyzeIssue,
        ToolName::CreateReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ClassifyIssue => "classify_issue",
            ToolName::AnalyzeIssue => "analyze_issue",
            ToolName::CreateReport => "create_report",
        }
    }

    /// Parse a model-supplied tool name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

/// A model-issued request to run one pipeline step.
///
/// Arguments are kept as the raw JSON object; required keys are checked at
/// dispatch time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolInvocation {
    /// Look up a string argument, treating blank strings as absent.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}
