//! Conversational core for SwachTrack.
//!
//! Wraps the hosted chat-completion endpoint behind [`ModelGateway`], runs
//! the classify / analyze / report pipeline steps, and drives multi-turn
//! chat sessions with model-driven tool dispatch.

pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod response;
pub mod session;

pub use error::ChatError;
pub use gateway::{
    AssistantMessage, CompletionRequest, MockGateway, ModelGateway, OpenAiCompatibleGateway,
    ResponseFormat, ToolSpec,
};
pub use orchestrator::{ChatOrchestrator, ChatOutcome, ChatTurn};
pub use pipeline::Pipeline;
pub use session::{InMemorySessionStore, SessionStore};
