pub mod config;
pub mod error;
pub mod types;

pub use config::SwachConfig;
pub use error::{Result, SwachError};
pub use types::*;
