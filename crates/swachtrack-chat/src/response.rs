//! Human-readable chat replies for tool results and fallbacks.
//!
//! Replies are markdown; the web client renders bold labels and lists.

use swachtrack_core::types::{AnalysisResult, ClassificationResult, Report};

/// Reply when the model returns neither text nor a tool call.
pub const DEFAULT_GREETING: &str =
    "I'm here to help you with civic issues. How can I assist you today?";

/// Reply when the model names a tool we do not provide.
pub const UNKNOWN_TOOL_REPLY: &str = "I'm not sure how to handle that request. Please try again.";

/// Reply when a dispatched tool fails.
pub const DISPATCH_FAILURE_REPLY: &str = "I encountered an error while processing your request. Please try again or provide more details about the issue.";

pub fn classification_reply(result: &ClassificationResult) -> String {
    format!(
        "I've classified your issue as: **{}** in **{}**. The severity indicators are: {}. \
         Would you like me to analyze this issue further and create a complete report?",
        result.category, result.location, result.severity_indicators
    )
}

pub fn analysis_reply(result: &AnalysisResult) -> String {
    format!(
        "Here's the analysis for your issue:\n\n\
         **Time Estimate:** {}\n\
         **Cost Estimate:** {}\n\
         **Manpower Required:** {}\n\
         **Recommended Company:** {}\n\
         **Severity:** {}\n\n\
         **Summary:** {}",
        result.time_estimate,
        result.cost_estimate,
        result.manpower_required,
        result.recommended_company,
        result.severity,
        result.summary
    )
}

pub fn report_reply(report: &Report) -> String {
    let steps = report
        .next_steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "✅ **Report Created Successfully!**\n\n\
         **Report ID:** {}\n\
         **Status:** {}\n\
         **Timestamp:** {}\n\n\
         **Issue Summary:**\n\
         - Category: {}\n\
         - Location: {}\n\
         - Severity: {}\n\
         - Estimated Cost: {}\n\
         - Time Required: {}\n\n\
         **Next Steps:**\n\
         {}\n\n\
         Your report has been forwarded to the municipal authorities. \
         You can use the Report ID to track the progress.",
        report.report_id,
        report.status,
        report.timestamp.to_rfc3339(),
        report.classification.category,
        report.classification.location,
        report.analysis.severity,
        report.analysis.cost_estimate,
        report.analysis.time_estimate,
        steps
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use swachtrack_core::types::NEXT_STEPS;

    fn classification() -> ClassificationResult {
        ClassificationResult {
            issue: "Streetlight broken near park".to_string(),
            category: "streetlights".to_string(),
            location: "Cubbon Park".to_string(),
            severity_indicators: "dark at night, pedestrian safety".to_string(),
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            time_estimate: "1 day".to_string(),
            cost_estimate: "₹8,000".to_string(),
            manpower_required: "2 electricians".to_string(),
            recommended_company: "BESCOM".to_string(),
            severity: "medium".to_string(),
            summary: "Replace the lamp and check wiring.".to_string(),
        }
    }

    #[test]
    fn test_classification_reply() {
        let reply = classification_reply(&classification());
        assert!(reply.contains("**streetlights** in **Cubbon Park**"));
        assert!(reply.contains("dark at night, pedestrian safety"));
        assert!(reply.ends_with("create a complete report?"));
    }

    #[test]
    fn test_analysis_reply_lists_every_field() {
        let reply = analysis_reply(&analysis());
        assert!(reply.starts_with("Here's the analysis for your issue:"));
        assert!(reply.contains("**Time Estimate:** 1 day"));
        assert!(reply.contains("**Cost Estimate:** ₹8,000"));
        assert!(reply.contains("**Manpower Required:** 2 electricians"));
        assert!(reply.contains("**Recommended Company:** BESCOM"));
        assert!(reply.contains("**Severity:** medium"));
        assert!(reply.contains("**Summary:** Replace the lamp"));
    }

    #[test]
    fn test_report_reply_numbers_next_steps() {
        let report = Report {
            report_id: "RPT-1700000000000".to_string(),
            timestamp: Utc::now(),
            original_issue: "streetlight broken near park".to_string(),
            classification: classification(),
            analysis: analysis(),
            status: "processed".to_string(),
            next_steps: NEXT_STEPS.iter().map(|s| s.to_string()).collect(),
        };
        let reply = report_reply(&report);
        assert!(reply.contains("**Report ID:** RPT-1700000000000"));
        assert!(reply.contains("**Status:** processed"));
        assert!(reply.contains("- Category: streetlights"));
        assert!(reply.contains("1. Forward to municipal department"));
        assert!(reply.contains("4. Monitor progress"));
        assert!(reply.contains("track the progress."));
    }
}
