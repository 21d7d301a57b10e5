//! SwachTrack application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration (file, then env, then flags)
//! 2. Build the model gateway and the shared chat core
//! 3. Start the axum REST API server

mod cli;

use std::sync::Arc;

use clap::Parser;

use swachtrack_api::routes;
use swachtrack_api::state::AppState;
use swachtrack_chat::OpenAiCompatibleGateway;
use swachtrack_core::config::SwachConfig;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = SwachConfig::load_or_default(&config_file);
    config.apply_env_overrides();
    args.apply_to(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting SwachTrack v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    if config.llm.api_key.is_none() {
        tracing::warn!("No LLM API key configured; model calls will fail upstream");
    }

    // Model gateway.
    let gateway = Arc::new(OpenAiCompatibleGateway::new(&config.llm)?);
    tracing::info!(
        url = gateway.chat_url(),
        model = %config.llm.model,
        "Model gateway ready"
    );

    tracing::info!(
        max_sessions = config.sessions.max_sessions,
        ttl_minutes = config.sessions.ttl_minutes,
        "Session store ready"
    );
    let state = AppState::new(config.clone(), gateway);

    // === API server ===

    if let Err(e) = routes::start_server(&config, state).await {
        tracing::error!(error = %e, "API server stopped");
        return Err(e.into());
    }

    Ok(())
}
