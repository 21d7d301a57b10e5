//! Pipeline steps: classify, analyze and the composed report.
//!
//! Each step is a single system + user exchange with the gateway, parsed
//! strictly into its result type. Steps keep no history between calls.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::de::DeserializeOwned;

use swachtrack_core::types::{
    AnalysisResult, ClassificationResult, Message, Report, Role, NEXT_STEPS, REPORT_STATUS,
};

use crate::error::ChatError;
use crate::gateway::{AssistantMessage, CompletionRequest, ModelGateway};
use crate::prompts;

/// Runs the three pipeline steps against a shared gateway.
#[derive(Clone)]
pub struct Pipeline {
    gateway: Arc<dyn ModelGateway>,
}

impl Pipeline {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Classify a free-text issue description.
    pub async fn classify(&self, issue: &str) -> Result<ClassificationResult, ChatError> {
        let issue = require("issue", issue)?;

        let request = CompletionRequest {
            response_format: Some(prompts::classification_format()),
            ..CompletionRequest::new(vec![
                Message::system(prompts::CLASSIFY_SYSTEM_PROMPT),
                Message::new(Role::User, issue),
            ])
        };

        let reply = self.call("classify", request).await?;
        let classification: ClassificationResult = parse_structured("classify", &reply)?;
        tracing::info!(
            category = %classification.category,
            location = %classification.location,
            "Issue classified"
        );
        Ok(classification)
    }

    /// Estimate remediation effort for a classified issue.
    pub async fn analyze(
        &self,
        issue: &str,
        category: &str,
        location: &str,
        severity_indicators: &str,
    ) -> Result<AnalysisResult, ChatError> {
        let issue = require("issue", issue)?;
        let category = require("category", category)?;
        let location = require("location", location)?;
        let severity_indicators = require("severity_indicators", severity_indicators)?;

        let request = CompletionRequest {
            response_format: Some(prompts::analysis_format()),
            ..CompletionRequest::new(vec![
                Message::system(prompts::ANALYZE_SYSTEM_PROMPT),
                Message::new(
                    Role::User,
                    prompts::analysis_prompt(issue, category, location, severity_indicators),
                ),
            ])
        };

        let reply = self.call("analyze", request).await?;
        let analysis: AnalysisResult = parse_structured("analyze", &reply)?;
        tracing::info!(severity = %analysis.severity, "Issue analyzed");
        Ok(analysis)
    }

    /// Classify, then analyze the classification, then assemble a report.
    ///
    /// Nothing after a failed step runs.
    pub async fn report(&self, issue: &str) -> Result<Report, ChatError> {
        let original_issue = require("issue", issue)?;

        let classification = self.classify(original_issue).await?;
        let analysis = self
            .analyze(
                &classification.issue,
                &classification.category,
                &classification.location,
                &classification.severity_indicators,
            )
            .await
            .map_err(|e| match e {
                // Blank classification fields are the model's fault, not the caller's.
                ChatError::MissingField(field) => ChatError::MalformedOutput(format!(
                    "classification returned an empty {field}"
                )),
                other => other,
            })?;

        let report = Report {
            report_id: generate_report_id(),
            timestamp: Utc::now(),
            original_issue: original_issue.to_string(),
            classification,
            analysis,
            status: REPORT_STATUS.to_string(),
            next_steps: NEXT_STEPS.iter().map(|s| s.to_string()).collect(),
        };
        tracing::info!(report_id = %report.report_id, "Report composed");
        Ok(report)
    }

    async fn call(
        &self,
        step: &'static str,
        request: CompletionRequest,
    ) -> Result<AssistantMessage, ChatError> {
        tracing::debug!(step, "Outbound model call issued");
        let started = Instant::now();
        match self.gateway.complete(request).await {
            Ok(reply) => {
                tracing::debug!(
                    step,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Outbound model call completed"
                );
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(step, error = %e, "Outbound model call failed");
                Err(e)
            }
        }
    }
}

/// Time-based report identifier: `RPT-<unix millis>`.
pub fn generate_report_id() -> String {
    format!("RPT-{}", Utc::now().timestamp_millis())
}

fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ChatError> {
    if value.trim().is_empty() {
        Err(ChatError::MissingField(field))
    } else {
        Ok(value)
    }
}

/// Parse the assistant content as `T`. Absent or unparseable content is an
/// error; there is no empty-object fallback.
fn parse_structured<T: DeserializeOwned>(
    step: &str,
    reply: &AssistantMessage,
) -> Result<T, ChatError> {
    let content = reply
        .trimmed_content()
        .ok_or_else(|| ChatError::MalformedOutput(format!("{step}: model returned no content")))?;

    serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ChatError::MalformedOutput(format!("{step}: {e}")))
}

/// Some models wrap JSON in a markdown fence even under a schema constraint.
fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// =============================================================================
// Tests
// =============================================================================
