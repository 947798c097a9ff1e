//! OpenAI-compatible HTTP facade over the Yuanbao transcoder.
//!
//! Routes:
//! - `POST /v1/chat/completions`: streaming (`text/event-stream`) or aggregated completions
//! - `GET /v1/models`: public model names
//! - `GET /health`: liveness

/// CLI and environment configuration.
pub mod config;
/// Request-level error type and its HTTP rendering.
pub mod errors;
/// Router and handlers.
pub mod routes;

pub use config::Cli;
pub use errors::ApiError;
pub use routes::{AppState, ChatCompletionRequest, build_router};
