//! Streaming transcoder from Yuanbao SSE to OpenAI chat-completion chunks.
//!
//! The upstream stream interleaves category marker lines (`data: text`) with
//! JSON payload lines; each payload is interpreted with the most recent
//! marker and re-emitted as a `chat.completion.chunk` whose content carries a
//! bracketed category tag.
//!
//! ```
//! use chatrelay_core::{ChunkBuilder, OutputEvent, Transcoder};
//!
//! let lines = ["data: status", r#"data: {"msg":"thinking"}"#, "data: [DONE]"];
//! let events: Vec<_> = Transcoder::new(ChunkBuilder::new("hunyuan"))
//!     .transcode_lines(lines)
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! assert!(matches!(&events[0], OutputEvent::Chunk(c) if c.content() == "[status]thinking"));
//! assert_eq!(events.last(), Some(&OutputEvent::Finish));
//! ```

/// Line classification and the category set.
pub mod classify;
/// Normalized chunk types, wire encoding and the chunk builder.
pub mod chunk;
/// Transcoder error taxonomy.
pub mod errors;
/// Byte stream to line stream decoding.
pub mod lines;
/// Process-wide tracing setup.
pub mod observability;
/// The per-stream transcoder state machine.
pub mod transcode;

pub use chunk::{ChatCompletion, ChunkBuilder, NormalizedChunk, OutputEvent};
pub use classify::{Category, LineKind, classify};
pub use errors::TranscodeError;
pub use lines::{LineDecoder, lines_from_bytes};
pub use observability::{ObservabilityConfig, init_observability, init_with};
pub use transcode::{
    DEFAULT_FINISH_REASON, TranscodeLines, Transcoder, TranscoderState, collect_completion,
    transcode_stream,
};
