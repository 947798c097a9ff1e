use crate::classify::{DATA_PREFIX, DONE_SENTINEL};

/// Incremental content of one choice.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChoiceDelta {
    pub content: String,
}

/// Single choice carried by a chunk.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChoiceDelta,
    pub finish_reason: Option<String>,
}

/// One unit of the OpenAI `chat.completion.chunk` streaming format.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NormalizedChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

impl NormalizedChunk {
    /// Content of the first choice (empty when there is none).
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.delta.content.as_str())
            .unwrap_or_default()
    }

    /// Finish reason of the first choice.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}

/// Item of a transcoded stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputEvent {
    Chunk(NormalizedChunk),
    /// Clean completion; always the last event.
    Finish,
}

impl OutputEvent {
    /// Encodes the event as one SSE frame (`data: ...\n\n`).
    pub fn to_sse(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Chunk(chunk) => Ok(format!(
                "{DATA_PREFIX}{}\n\n",
                serde_json::to_string(chunk)?
            )),
            Self::Finish => Ok(format!("{DATA_PREFIX}{DONE_SENTINEL}\n\n")),
        }
    }
}

/// Stamps chunks with a per-stream envelope.
///
/// The id, creation time and model are fixed when the builder is created so
/// every chunk of one stream shares them.
#[derive(Clone, Debug)]
pub struct ChunkBuilder {
    id: String,
    created: i64,
    model: String,
}

impl ChunkBuilder {
    /// Creates a builder for `model`, stamped with the current time.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
        }
    }

    /// Overrides the response id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    /// Wraps `content` into a single-choice chunk.
    pub fn build(&self, content: impl Into<String>, finish_reason: Option<String>) -> NormalizedChunk {
        NormalizedChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChoiceDelta {
                    content: content.into(),
                },
                finish_reason,
            }],
        }
    }
}

/// Assistant message of a non-streaming completion.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: String,
}

/// Aggregated `chat.completion` response built from a finished stream.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
}

impl ChatCompletion {
    pub(crate) fn from_parts(builder: &ChunkBuilder, content: String, finish_reason: String) -> Self {
        Self {
            id: builder.id().to_string(),
            object: "chat.completion".to_string(),
            created: builder.created(),
            model: builder.model().to_string(),
            choices: vec![CompletionChoice {
                index: 0,
                message: CompletionMessage {
                    role: "assistant".to_string(),
                    content,
                },
                finish_reason,
            }],
        }
    }

    /// Content of the first choice.
    pub fn text(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default()
    }
}
