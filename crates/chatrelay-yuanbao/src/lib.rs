//! Yuanbao upstream integration: model table, session headers, prompt
//! flattening and the streaming HTTP client.
//!
//! ```no_run
//! use chatrelay_core::{ChunkBuilder, transcode_stream};
//! use chatrelay_yuanbao::{
//!     Message, SessionCredentials, UpstreamRequest, UpstreamSession, YuanbaoClient,
//!     flatten_messages, resolve_model,
//! };
//! use futures::StreamExt as _;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = YuanbaoClient::from_env()?;
//! let credentials = SessionCredentials {
//!     hy_source: "web".into(),
//!     hy_user: "user".into(),
//!     hy_token: "token".into(),
//!     agent_id: "naQivTmsDa".into(),
//! };
//! let model = resolve_model("deepseek-v3").ok_or("unknown model")?;
//! let chat_id = client.create_conversation(&credentials).await?;
//! let lines = client
//!     .open_lines(UpstreamRequest {
//!         chat_id,
//!         credentials,
//!         prompt: flatten_messages(&[Message::new("user", "hello")]),
//!         model: model.clone(),
//!     })
//!     .await?;
//!
//! let mut events = std::pin::pin!(transcode_stream(lines, ChunkBuilder::new(model.name)));
//! while let Some(event) = events.next().await {
//!     print!("{}", event?.to_sse()?);
//! }
//! # Ok(())
//! # }
//! ```

/// Streaming HTTP client and the session trait.
pub mod client;
/// Client configuration.
pub mod config;
/// Error types for upstream calls.
pub mod errors;
/// Upstream header construction.
pub mod headers;
/// Public model table.
pub mod models;
/// Conversation flattening.
pub mod prompt;
/// Messages, credentials and request types.
pub mod session;

pub use client::{LineStream, UpstreamSession, YuanbaoClient, build_chat_body};
pub use config::YuanbaoClientConfig;
pub use errors::YuanbaoError;
pub use headers::build_headers;
pub use models::{UpstreamModelInfo, resolve_model, supported_models};
pub use prompt::flatten_messages;
pub use session::{Message, SessionCredentials, UpstreamRequest};
