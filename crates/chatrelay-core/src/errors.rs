use crate::classify::Category;

/// Fatal failures raised while transcoding an upstream stream.
///
/// Any of these ends the output sequence: no further events are produced
/// after the error is yielded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscodeError {
    /// A line classified as a JSON payload did not parse as a JSON object.
    #[error("malformed payload under category {category}: {message}")]
    MalformedPayload { category: Category, message: String },
    /// A payload lacked the field its category requires.
    #[error("payload under category {category} is missing field `{field}`")]
    MissingField {
        category: Category,
        field: &'static str,
    },
    /// The output stream ended before the terminal sentinel was observed.
    #[error("stream ended without a terminal sentinel")]
    IncompleteStream,
}

impl TranscodeError {
    pub(crate) fn malformed(category: Category, err: impl std::fmt::Display) -> Self {
        Self::MalformedPayload {
            category,
            message: err.to_string(),
        }
    }

    pub(crate) fn missing(category: Category, field: &'static str) -> Self {
        Self::MissingField { category, field }
    }

    /// Short machine-readable kind, used in wire-level error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::MissingField { .. } => "missing_field",
            Self::IncompleteStream => "incomplete_stream",
        }
    }
}
