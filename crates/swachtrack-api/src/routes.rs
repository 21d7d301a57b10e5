//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use swachtrack_core::config::SwachConfig;
use swachtrack_core::error::SwachError;

use crate::handlers;
use crate::state::AppState;

pub const BODY_LIMIT: usize = 1024 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Public API: any origin may call it.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/status",
            get(handlers::status).fallback(handlers::get_only),
        )
        .route(
            "/classify",
            post(handlers::classify).fallback(handlers::post_only),
        )
        .route(
            "/analyze",
            post(handlers::analyze).fallback(handlers::post_only),
        )
        .route(
            "/report",
            post(handlers::report).fallback(handlers::post_only),
        )
        .route(
            "/chat",
            post(handlers::chat).fallback(handlers::post_only),
        );

    let router = Router::new()
        .route("/", get(handlers::root).fallback(handlers::get_only))
        .route("/health", get(handlers::health).fallback(handlers::get_only))
        .nest("/api", api_routes)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    with_security_headers(router).layer(cors).with_state(state)
}

/// Conservative response headers for a JSON API.
fn with_security_headers(router: Router<AppState>) -> Router<AppState> {
    let headers: [(HeaderName, &'static str); 6] = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
        (header::REFERRER_POLICY, "no-referrer"),
        (
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=15552000; includeSubDomains",
        ),
        (header::X_DNS_PREFETCH_CONTROL, "off"),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            "same-origin",
        ),
    ];
    headers.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ))
    })
}

/// Bind to the configured host and port and serve until the process exits.
pub async fn start_server(config: &SwachConfig, state: AppState) -> Result<(), SwachError> {
    let addr = format!("{}:{}", config.general.host, config.general.port);
    let router = create_router(state);

    tracing::info!(addr = %addr, environment = %config.general.environment, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SwachError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| SwachError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
