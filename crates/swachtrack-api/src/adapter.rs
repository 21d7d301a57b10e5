//! Serverless function adapter.
//!
//! Hosts that invoke a function per request hand over a JSON event instead of
//! a socket. [`handle_event`] turns that event into an HTTP request, runs it
//! through the same router the server uses, and flattens the response back
//! into the host's `{statusCode, headers, body}` shape.

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

use crate::error::{ApiError, INVALID_JSON_MESSAGE};
use crate::routes::BODY_LIMIT;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Handle one function invocation.
pub async fn handle_event(router: Router, event: FunctionEvent) -> FunctionResponse {
    match build_request(&event) {
        Ok(request) => {
            let response = match router.oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
            into_function_response(response).await
        }
        Err(err) => into_function_response(err.into_response()).await,
    }
}

fn build_request(event: &FunctionEvent) -> Result<Request<Body>, ApiError> {
    let method = Method::from_bytes(event.http_method.to_ascii_uppercase().as_bytes())
        .map_err(|_| ApiError::post_only())?;

    // Reject malformed JSON up front, before routing.
    let body = match event.body.as_deref() {
        Some(raw) if method != Method::GET && !raw.trim().is_empty() => {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(raw) {
                return Err(ApiError::BadRequest {
                    message: INVALID_JSON_MESSAGE.to_string(),
                    details: Some(e.to_string()),
                });
            }
            Body::from(raw.to_string())
        }
        _ => Body::empty(),
    };

    Request::builder()
        .method(method)
        .uri(event.path.as_str())
        .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(body)
        .map_err(|_| ApiError::NotFound(format!("Route {} not found", event.path)))
}

async fn into_function_response(response: Response) -> FunctionResponse {
    let status_code = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = match axum::body::to_bytes(response.into_body(), BODY_LIMIT).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read function response body");
            return internal_response(e.to_string());
        }
    };

    FunctionResponse {
        status_code,
        headers,
        body,
    }
}

fn internal_response(details: String) -> FunctionResponse {
    let err = ApiError::Internal {
        message: "Failed to read response body".to_string(),
        details: Some(details),
    };
    FunctionResponse {
        status_code: err.status().as_u16(),
        headers: BTreeMap::from([(
            header::CONTENT_TYPE.as_str().to_string(),
            "application/json".to_string(),
        )]),
        body: serde_json::to_string(&err.body()).unwrap_or_default(),
    }
}
