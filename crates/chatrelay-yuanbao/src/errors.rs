/// Errors raised while talking to the Yuanbao upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum YuanbaoError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Request fields were rejected before contacting the upstream.
    #[error("validation error: {0}")]
    Validation(String),
    /// Network or body I/O failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// Upstream answered with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    /// Upstream answered with an unexpected body shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl YuanbaoError {
    pub(crate) fn transport(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport(format!("{context}: {err}"))
    }

    /// HTTP status reported by the upstream, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
