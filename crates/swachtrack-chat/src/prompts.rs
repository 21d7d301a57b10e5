//! Fixed prompt text, output schemas and the tool catalog.

use serde_json::{json, Value};

use swachtrack_core::types::ToolName;

use crate::gateway::{ResponseFormat, ToolSpec};

pub const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are an AI classifier for civic issues reported by citizens in Indian cities. You receive a description or image-based details of the problem. Your job is to:

1. Classify the issue into exactly one of these categories relevant to Indian urban contexts: "streetlights", "potholes", "overflowing dustbins", "water logging", "roadblocks", "broken footpaths", "garbage dumping", or "other civic issues". Choose only one category that best fits the report. If the issue is unclear or does not fit any, select "other civic issues".

2. Extract the location mentioned in the issue description. If no specific location is mentioned, infer a general area or return "Location not specified".

3. Assess severity indicators based on the description, considering factors like:
   - Traffic impact
   - Safety concerns
   - Environmental impact
   - Population density
   - Weather conditions (monsoon, etc.)
   - Urgency level

Return all three pieces of information in the specified JSON format."#;

pub const ANALYZE_SYSTEM_PROMPT: &str = r#"You are an AI assistant specializing in civic issue management for Indian municipalities. Given a detailed report with issue category, location in an Indian city, severity indicators (urgency, damage extent), and any textual or visual context, perform these tasks:

- Estimate the time, cost (in INR), and manpower needed to fix the issue based on typical Indian municipal standards.
- Recommend the best suitable Indian company or local contractor for this issue, considering region, company expertise, and availability.
- Assess the severity on a scale (low, medium, high) incorporating factors such as monsoon impact, population density, and traffic conditions typical of Indian cities.
- Generate a concise summary that includes issue category, resource estimates, recommended company, severity level, and critical notes.

EXAMPLE:
{
"time_estimate": "2 days",
"cost_estimate": "₹35,000",
"manpower_required": "5 workers",
"recommended_company": "Delhi Urban Services Ltd.",
"severity": "high",
"summary": "Water logging reported near MG Road, Mumbai. Estimated repair time 2 days with moderate cost. Delhi Urban Services Ltd. recommended due to proven expertise. Severity high due to monsoon season and heavy traffic."
}

NOTE: Make sure all responses suit the urban Indian environment and municipal practices."#;

pub const ASSISTANT_SYSTEM_PROMPT: &str = r#"You are SwachTrack AI Assistant, a helpful civic issue management bot for Indian municipalities. You help citizens report and track civic issues like potholes, streetlights, water logging, garbage problems, etc.

Your capabilities:
1. Help citizens report civic issues by understanding their descriptions
2. Classify issues into appropriate categories
3. Analyze issues and provide estimates for resolution
4. Create comprehensive reports for municipal authorities
5. Answer questions about civic issues and municipal services

When a citizen wants to report an issue:
1. First, understand and clarify the issue details
2. Use the classify function to categorize the issue
3. Use the analyze function to get estimates and recommendations
4. Use the report function to create a complete report
5. Provide the citizen with a report ID and next steps

Be friendly, helpful, and professional. Always ask for clarification if the issue description is unclear. Focus on Indian urban contexts and municipal practices.

Available functions:
- classify_issue(issue_description): Classify a civic issue
- analyze_issue(issue, category, location, severity): Analyze issue and get estimates
- create_report(issue_description): Create a complete report with classification and analysis

Always respond in a conversational manner and guide citizens through the reporting process."#;

/// User turn for the analyze step. Every field is inserted verbatim.
pub fn analysis_prompt(
    issue: &str,
    category: &str,
    location: &str,
    severity_indicators: &str,
) -> String {
    format!(
        "Issue: {issue}\n\
         Category: {category}\n\
         Location: {location}\n\
         Severity Indicators: {severity_indicators}\n\
         \n\
         Please analyze this civic issue and provide detailed estimates and recommendations."
    )
}

fn string_object_schema(fields: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|f| (f.to_string(), json!({"type": "string"})))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": fields,
        "additionalProperties": false,
    })
}

pub fn classification_format() -> ResponseFormat {
    ResponseFormat {
        name: "classification_schema".to_string(),
        schema: string_object_schema(&["issue", "category", "location", "severity_indicators"]),
    }
}

pub fn analysis_format() -> ResponseFormat {
    ResponseFormat {
        name: "analysis_schema".to_string(),
        schema: string_object_schema(&[
            "time_estimate",
            "cost_estimate",
            "manpower_required",
            "recommended_company",
            "severity",
            "summary",
        ]),
    }
}

/// Argument keys each tool requires, in declaration order.
pub fn required_arguments(tool: ToolName) -> &'static [&'static str] {
    match tool {
        ToolName::ClassifyIssue | ToolName::CreateReport => &["issue_description"],
        ToolName::AnalyzeIssue => &["issue", "category", "location", "severity_indicators"],
    }
}

/// The function catalog offered to the chat assistant.
pub fn tool_catalog() -> Vec<ToolSpec> {
    ToolName::ALL
        .into_iter()
        .map(|tool| {
            let (description, parameters) = match tool {
                ToolName::ClassifyIssue => (
                    "Classify a civic issue into appropriate category",
                    json!({
                        "type": "object",
                        "properties": {
                            "issue_description": {
                                "type": "string",
                                "description": "Description of the civic issue to classify"
                            }
                        },
                        "required": required_arguments(tool),
                    }),
                ),
                ToolName::AnalyzeIssue => (
                    "Analyze a civic issue and provide estimates",
                    json!({
                        "type": "object",
                        "properties": {
                            "issue": {"type": "string"},
                            "category": {"type": "string"},
                            "location": {"type": "string"},
                            "severity_indicators": {"type": "string"}
                        },
                        "required": required_arguments(tool),
                    }),
                ),
                ToolName::CreateReport => (
                    "Create a complete civic issue report",
                    json!({
                        "type": "object",
                        "properties": {
                            "issue_description": {
                                "type": "string",
                                "description": "Description of the civic issue to report"
                            }
                        },
                        "required": required_arguments(tool),
                    }),
                ),
            };
            ToolSpec {
                name: tool.as_str().to_string(),
                description: description.to_string(),
                parameters,
            }
        })
        .collect()
}
