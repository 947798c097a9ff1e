use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chatrelay_core::{
    ChunkBuilder, OutputEvent, TranscodeError, collect_completion, transcode_stream,
};
use chatrelay_yuanbao::{
    Message, SessionCredentials, UpstreamRequest, UpstreamSession, flatten_messages,
    resolve_model, supported_models,
};
use futures::StreamExt as _;
use tracing::{info, warn};

use crate::errors::{ApiError, error_body};

/// Body of `POST /v1/chat/completions`.
///
/// Besides the OpenAI fields it carries the upstream browser session
/// identifiers; the session token travels as the bearer token.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    /// Existing upstream conversation; a new one is created when absent.
    #[serde(default)]
    pub chat_id: Option<String>,
    pub hy_source: String,
    pub hy_user: String,
    pub agent_id: String,
}

fn default_stream() -> bool {
    true
}

/// Shared state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamSession>,
}

/// Builds the relay router around an upstream session source.
pub fn build_router(upstream: Arc<dyn UpstreamSession>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(AppState { upstream })
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_models() -> Json<serde_json::Value> {
    let data: Vec<_> = supported_models()
        .map(|id| serde_json::json!({ "id": id, "object": "model", "owned_by": "yuanbao" }))
        .collect();
    Json(serde_json::json!({ "object": "list", "data": data }))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
}

async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    let model = resolve_model(&request.model)
        .ok_or_else(|| ApiError::ModelNotFound(request.model.clone()))?;
    if request.messages.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".into()));
    }

    let credentials = SessionCredentials {
        hy_source: request.hy_source,
        hy_user: request.hy_user,
        hy_token: token,
        agent_id: request.agent_id,
    };
    credentials.validate()?;

    let chat_id = match request.chat_id.filter(|id| !id.trim().is_empty()) {
        Some(chat_id) => chat_id,
        None => state.upstream.create_conversation(&credentials).await?,
    };
    info!(
        model = %model.name,
        chat_id = %chat_id,
        messages = request.messages.len(),
        stream = request.stream,
        "chat completion"
    );

    let builder = ChunkBuilder::new(model.name.clone());
    let lines = state
        .upstream
        .open_lines(UpstreamRequest {
            chat_id,
            credentials,
            prompt: flatten_messages(&request.messages),
            model,
        })
        .await?;
    let events = transcode_stream(lines, builder.clone());

    if request.stream {
        Ok(sse_response(events))
    } else {
        let completion = collect_completion(events, &builder).await?;
        Ok(Json(completion).into_response())
    }
}

fn error_frame(message: &str, kind: &str) -> String {
    format!("data: {}\n\n", error_body(message, kind))
}

/// Streams events as SSE frames; a fatal error becomes a final error frame
/// and the body ends without `[DONE]`.
fn sse_response<S>(events: S) -> Response
where
    S: futures::Stream<Item = Result<OutputEvent, TranscodeError>> + Send + 'static,
{
    let frames = events.map(|event| {
        let frame = match event {
            Ok(event) => event
                .to_sse()
                .unwrap_or_else(|e| error_frame(&e.to_string(), "serialization_error")),
            Err(err) => {
                warn!(error = %err, "upstream stream failed");
                error_frame(&err.to_string(), err.kind())
            }
        };
        Ok::<_, std::io::Error>(Bytes::from(frame))
    });

    let mut response = Response::new(Body::from_stream(frames));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chatrelay_yuanbao::{LineStream, YuanbaoError};
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct FakeUpstream {
        lines: Vec<String>,
        open_error: Option<YuanbaoError>,
        created: Mutex<Vec<String>>,
        opened: Mutex<Vec<UpstreamRequest>>,
    }

    impl FakeUpstream {
        fn with_lines(lines: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                open_error: None,
                created: Mutex::new(Vec::new()),
                opened: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: YuanbaoError) -> Arc<Self> {
            Arc::new(Self {
                lines: Vec::new(),
                open_error: Some(err),
                created: Mutex::new(Vec::new()),
                opened: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl UpstreamSession for FakeUpstream {
        async fn create_conversation(
            &self,
            credentials: &SessionCredentials,
        ) -> Result<String, YuanbaoError> {
            self.created
                .lock()
                .expect("lock")
                .push(credentials.agent_id.clone());
            Ok("fresh-chat".to_string())
        }

        async fn open_lines(&self, request: UpstreamRequest) -> Result<LineStream, YuanbaoError> {
            self.opened.lock().expect("lock").push(request);
            if let Some(err) = &self.open_error {
                return Err(err.clone());
            }
            Ok(Box::pin(futures::stream::iter(self.lines.clone())))
        }
    }

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/chat/completions")
            .header("content-type", "application/json")
            .header("authorization", "Bearer tok")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn chat_body(stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": "deepseek-v3",
            "messages": [{"role": "user", "content": "hello"}],
            "stream": stream,
            "hy_source": "web",
            "hy_user": "user-1",
            "agent_id": "naQivTmsDa"
        })
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), 10 * 1024 * 1024)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    fn sse_payloads(body: &str) -> Vec<String> {
        body.split("\n\n")
            .filter_map(|frame| frame.strip_prefix("data: "))
            .map(ToOwned::to_owned)
            .collect()
    }

    const STATUS_STREAM: &[&str] = &[
        "data: status",
        r#"data: {"msg":"thinking"}"#,
        "",
        "data: text",
        r#"data: {"msg":"hi"}"#,
        "data: [DONE]",
    ];

    #[tokio::test]
    async fn health_returns_200() {
        let app = build_router(FakeUpstream::with_lines(&[]));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn models_lists_public_names() {
        let app = build_router(FakeUpstream::with_lines(&[]));
        let resp = app
            .oneshot(Request::get("/v1/models").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(resp).await).expect("json");
        assert_eq!(body["object"], "list");
        let ids: Vec<&str> = body["data"]
            .as_array()
            .expect("data")
            .iter()
            .filter_map(|m| m["id"].as_str())
            .collect();
        assert!(ids.contains(&"deepseek-v3"));
        assert!(ids.contains(&"hunyuan-t1"));
    }

    #[tokio::test]
    async fn streaming_request_relays_tagged_chunks_then_done() {
        let upstream = FakeUpstream::with_lines(STATUS_STREAM);
        let app = build_router(upstream.clone());
        let resp = app.oneshot(chat_request(chat_body(true))).await.expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("text/event-stream")
        );

        let body = body_text(resp).await;
        let payloads = sse_payloads(&body);
        assert_eq!(payloads.len(), 4);
        let contents: Vec<serde_json::Value> = payloads[..3]
            .iter()
            .map(|p| serde_json::from_str::<serde_json::Value>(p).expect("chunk json"))
            .collect();
        assert_eq!(contents[0]["choices"][0]["delta"]["content"], "[status]thinking");
        assert_eq!(contents[1]["choices"][0]["delta"]["content"], "[text]hi");
        assert_eq!(contents[2]["choices"][0]["delta"]["content"], "");
        assert_eq!(contents[2]["choices"][0]["finish_reason"], "stop");
        assert_eq!(contents[0]["model"], "deepseek-v3");
        assert_eq!(payloads[3], "[DONE]");

        assert_eq!(*upstream.created.lock().expect("lock"), vec!["naQivTmsDa"]);
        let opened = upstream.opened.lock().expect("lock");
        assert_eq!(opened[0].chat_id, "fresh-chat");
        assert_eq!(opened[0].prompt, "hello");
        assert_eq!(opened[0].credentials.hy_token, "tok");
    }

    #[tokio::test]
    async fn existing_chat_id_skips_conversation_creation() {
        let upstream = FakeUpstream::with_lines(STATUS_STREAM);
        let mut body = chat_body(true);
        body["chat_id"] = serde_json::json!("chat-7");
        let resp = build_router(upstream.clone())
            .oneshot(chat_request(body))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        let _ = body_text(resp).await;
        assert!(upstream.created.lock().expect("lock").is_empty());
        assert_eq!(upstream.opened.lock().expect("lock")[0].chat_id, "chat-7");
    }

    #[tokio::test]
    async fn malformed_upstream_payload_ends_with_error_frame() {
        let upstream = FakeUpstream::with_lines(&[
            "data: text",
            r#"data: {"msg":"a"}"#,
            "data: {broken",
            r#"data: {"msg":"b"}"#,
            "data: [DONE]",
        ]);
        let resp = build_router(upstream)
            .oneshot(chat_request(chat_body(true)))
            .await
            .expect("response");
        let payloads = sse_payloads(&body_text(resp).await);
        assert_eq!(payloads.len(), 2);
        let error: serde_json::Value = serde_json::from_str(&payloads[1]).expect("error json");
        assert_eq!(error["error"]["type"], "malformed_payload");
        assert!(!payloads.iter().any(|p| p == "[DONE]"));
    }

    #[tokio::test]
    async fn truncated_upstream_ends_without_done() {
        let upstream = FakeUpstream::with_lines(&["data: text", r#"data: {"msg":"a"}"#]);
        let resp = build_router(upstream)
            .oneshot(chat_request(chat_body(true)))
            .await
            .expect("response");
        let payloads = sse_payloads(&body_text(resp).await);
        assert_eq!(payloads.len(), 1);
        assert!(!payloads.iter().any(|p| p == "[DONE]"));
    }

    #[tokio::test]
    async fn non_streaming_request_returns_completion() {
        let upstream = FakeUpstream::with_lines(STATUS_STREAM);
        let resp = build_router(upstream)
            .oneshot(chat_request(chat_body(false)))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(resp).await).expect("json");
        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["choices"][0]["message"]["role"], "assistant");
        assert_eq!(body["choices"][0]["message"]["content"], "[status]thinking[text]hi");
        assert_eq!(body["choices"][0]["finish_reason"], "stop");
    }

    #[tokio::test]
    async fn non_streaming_truncated_upstream_is_bad_gateway() {
        let upstream = FakeUpstream::with_lines(&["data: text", r#"data: {"msg":"a"}"#]);
        let resp = build_router(upstream)
            .oneshot(chat_request(chat_body(false)))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn missing_bearer_token_is_401() {
        let request = Request::builder()
            .method("POST")
            .uri("/v1/chat/completions")
            .header("content-type", "application/json")
            .body(Body::from(chat_body(true).to_string()))
            .expect("request");
        let resp = build_router(FakeUpstream::with_lines(&[]))
            .oneshot(request)
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_model_is_404() {
        let mut body = chat_body(true);
        body["model"] = serde_json::json!("gpt-4o");
        let resp = build_router(FakeUpstream::with_lines(&[]))
            .oneshot(chat_request(body))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_str(&body_text(resp).await).expect("json");
        assert_eq!(body["error"]["type"], "model_not_found");
    }

    #[tokio::test]
    async fn empty_messages_is_400() {
        let mut body = chat_body(true);
        body["messages"] = serde_json::json!([]);
        let resp = build_router(FakeUpstream::with_lines(&[]))
            .oneshot(chat_request(body))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upstream_failure_is_502() {
        let upstream = FakeUpstream::failing(YuanbaoError::Upstream {
            status: 500,
            body: "boom".into(),
        });
        let resp = build_router(upstream)
            .oneshot(chat_request(chat_body(true)))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn concurrent_streams_are_independent() {
        let app = build_router(FakeUpstream::with_lines(STATUS_STREAM));
        let requests = (0..4).map(|_| {
            let app = app.clone();
            async move {
                let resp = app.oneshot(chat_request(chat_body(true))).await.expect("response");
                sse_payloads(&body_text(resp).await)
            }
        });
        for payloads in futures::future::join_all(requests).await {
            assert_eq!(payloads.len(), 4);
            assert_eq!(payloads[3], "[DONE]");
        }
    }
}
