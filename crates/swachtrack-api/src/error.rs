//! API error types and JSON error response formatting.
//!
//! Every failure leaves the server as `{error, message, details?, timestamp}`
//! with a machine-readable `error` code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use swachtrack_chat::ChatError;
use swachtrack_core::error::SwachError;

pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Only POST method is allowed for this endpoint";
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON in request body";

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 - missing field or unparseable body.
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },
    /// 404 - no route matched.
    #[error("{0}")]
    NotFound(String),
    /// 405 - the route exists but not for this method.
    #[error("Only {allowed} method is allowed for this endpoint")]
    MethodNotAllowed { allowed: &'static str },
    /// 500 - the model call or its output failed.
    #[error("{message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// Map a core error onto the HTTP surface. Validation errors become 400;
    /// everything else is a 500 carrying `context` as the message and the
    /// underlying error text as details.
    pub fn from_chat(context: &str, err: ChatError) -> Self {
        if err.is_validation() {
            return ApiError::bad_request(err.to_string());
        }
        tracing::error!(error = %err, "{}", context);
        ApiError::Internal {
            message: context.to_string(),
            details: Some(err.to_string()),
        }
    }

    pub fn post_only() -> Self {
        ApiError::MethodNotAllowed { allowed: "POST" }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::MethodNotAllowed { .. } => "method_not_allowed",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let details = match self {
            ApiError::BadRequest { details, .. } | ApiError::Internal { details, .. } => {
                details.clone().map(serde_json::Value::String)
            }
            _ => None,
        };
        let message = match self {
            ApiError::BadRequest { message, .. } | ApiError::Internal { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        };
        ErrorBody {
            error: self.code().to_string(),
            message,
            details,
            timestamp: Utc::now(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<SwachError> for ApiError {
    fn from(err: SwachError) -> Self {
        match err {
            SwachError::Validation(msg) => ApiError::bad_request(msg),
            other => ApiError::Internal {
                message: "Internal server error".to_string(),
                details: Some(other.to_string()),
            },
        }
    }
}
