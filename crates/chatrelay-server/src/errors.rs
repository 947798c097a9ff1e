use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chatrelay_core::TranscodeError;
use chatrelay_yuanbao::YuanbaoError;

/// Request-level failures, rendered as OpenAI-style error bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error(transparent)]
    Upstream(#[from] YuanbaoError),

    #[error(transparent)]
    Stream(#[from] TranscodeError),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "authentication_error"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            ApiError::ModelNotFound(_) => (StatusCode::NOT_FOUND, "model_not_found"),
            ApiError::Upstream(YuanbaoError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            ApiError::Upstream(YuanbaoError::Config(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
            }
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ApiError::Stream(err) => (StatusCode::BAD_GATEWAY, err.kind()),
        }
    }
}

/// JSON error body shared by HTTP responses and in-stream error frames.
pub(crate) fn error_body(message: &str, kind: &str) -> serde_json::Value {
    serde_json::json!({ "error": { "message": message, "type": kind } })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::warn!(error = %self, %status, "request failed");
        }
        (status, Json(error_body(&self.to_string(), kind))).into_response()
    }
}
