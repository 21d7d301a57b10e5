//! SwachTrack HTTP surface.
//!
//! The axum router serves the classify / analyze / report endpoints and the
//! chat endpoint; [`adapter`] exposes the same router to serverless hosts.

pub mod adapter;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use adapter::{handle_event, FunctionEvent, FunctionResponse};
pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
