//! Route handler functions for all API endpoints.
//!
//! POST bodies go through [`JsonBody`] so a malformed body is answered with
//! the JSON error shape instead of axum's plain-text rejection. Field
//! presence is checked by the pipeline steps.

use axum::body::Bytes;
use axum::extract::{FromRequest, OriginalUri, Request, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use swachtrack_chat::{ChatError, ChatTurn};
use swachtrack_core::types::{AnalysisResult, ClassificationResult, Message, Report};

use crate::error::{ApiError, INVALID_JSON_MESSAGE};
use crate::state::AppState;

pub const API_VERSION: &str = "1.0.0";

// =============================================================================
// Body extraction
// =============================================================================

/// JSON request body. An empty body reads as `{}`, so a bodiless POST is
/// reported by the missing field rather than as invalid JSON.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest {
                message: "Failed to read request body".to_string(),
                details: Some(rejection.body_text()),
            })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }

        match Json::<T>::from_bytes(&bytes) {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!(rejection = %rejection.body_text(), "Rejected request body");
                Err(ApiError::BadRequest {
                    message: INVALID_JSON_MESSAGE.to_string(),
                    details: Some(rejection.body_text()),
                })
            }
        }
    }
}

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct IssueRequest {
    #[serde(default)]
    pub issue: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub severity_indicators: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub conversation_history: Option<Vec<Message>>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Endpoints {
    pub health: String,
    pub api: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub conversation_history: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<Vec<String>>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "SwachTrack API is running".to_string(),
        timestamp: Utc::now(),
        environment: state.config.general.environment.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to SwachTrack API".to_string(),
        version: API_VERSION.to_string(),
        endpoints: Endpoints {
            health: "/health".to_string(),
            api: "/api".to_string(),
        },
    })
}

/// GET /api/status
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "SwachTrack API is operational".to_string(),
        version: API_VERSION.to_string(),
    })
}

/// POST /api/classify
pub async fn classify(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<IssueRequest>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let issue = body.issue.unwrap_or_default();
    tracing::info!(endpoint = "classify", "Request received");

    state
        .pipeline
        .classify(&issue)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_chat("Failed to classify issue", e))
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, ApiError> {
    tracing::info!(endpoint = "analyze", "Request received");

    state
        .pipeline
        .analyze(
            body.issue.as_deref().unwrap_or_default(),
            body.category.as_deref().unwrap_or_default(),
            body.location.as_deref().unwrap_or_default(),
            body.severity_indicators.as_deref().unwrap_or_default(),
        )
        .await
        .map(Json)
        .map_err(|e| ApiError::from_chat("Failed to analyze issue", e))
}

/// POST /api/report
pub async fn report(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<IssueRequest>,
) -> Result<Json<Report>, ApiError> {
    let issue = body.issue.unwrap_or_default();
    tracing::info!(endpoint = "report", "Request received");

    state
        .pipeline
        .report(&issue)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_chat("Failed to process civic issue report", e))
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = match body.message {
        Some(m) if !m.trim().is_empty() => m,
        _ => return Err(ApiError::bad_request(ChatError::MissingField("message").to_string())),
    };
    tracing::info!(
        endpoint = "chat",
        has_session = body.session_id.is_some(),
        "Request received"
    );

    let outcome = state
        .orchestrator
        .handle_message(ChatTurn {
            message,
            session_id: body.session_id,
            history: body.conversation_history.unwrap_or_default(),
        })
        .await
        .map_err(|e| ApiError::from_chat("Failed to process chat message", e))?;

    Ok(Json(ChatResponse {
        response: outcome.reply,
        session_id: outcome.session_id,
        conversation_history: outcome.transcript,
        report_id: outcome.report_id,
        next_steps: outcome.next_steps,
    }))
}

/// Method fallback for the POST-only endpoints.
pub async fn post_only() -> ApiError {
    ApiError::post_only()
}

/// Method fallback for the read-only endpoints.
pub async fn get_only() -> ApiError {
    ApiError::MethodNotAllowed { allowed: "GET" }
}

/// Router fallback.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(format!("Route {} not found", uri.path()))
}
