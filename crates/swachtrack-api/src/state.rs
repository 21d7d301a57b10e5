//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use swachtrack_chat::prompts::ASSISTANT_SYSTEM_PROMPT;
use swachtrack_chat::{ChatOrchestrator, InMemorySessionStore, ModelGateway, Pipeline, SessionStore};
use swachtrack_core::config::SwachConfig;

/// Shared application state.
///
/// Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SwachConfig>,
    /// Stateless classify / analyze / report steps.
    pub pipeline: Pipeline,
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Build state with the in-memory session store sized from config.
    pub fn new(config: SwachConfig, gateway: Arc<dyn ModelGateway>) -> Self {
        let store = Arc::new(InMemorySessionStore::from_config(
            ASSISTANT_SYSTEM_PROMPT,
            &config.sessions,
        ));
        Self::with_store(config, gateway, store)
    }

    pub fn with_store(
        config: SwachConfig,
        gateway: Arc<dyn ModelGateway>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let orchestrator = ChatOrchestrator::new(gateway, store, &config.llm);
        Self {
            pipeline: orchestrator.pipeline().clone(),
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
