use std::pin::Pin;

use tracing::{debug, info};

use crate::config::YuanbaoClientConfig;
use crate::errors::YuanbaoError;
use crate::headers::build_headers;
use crate::session::{SessionCredentials, UpstreamRequest};

/// Raw upstream lines, in arrival order.
pub type LineStream = Pin<Box<dyn futures::Stream<Item = String> + Send + 'static>>;

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Source of upstream chat streams.
///
/// The HTTP facade holds one behind an `Arc`; tests swap in a fake.
#[async_trait::async_trait]
pub trait UpstreamSession: Send + Sync {
    /// Creates a new conversation and returns its chat id.
    async fn create_conversation(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<String, YuanbaoError>;

    /// Sends the prompt and returns the response body as lines.
    async fn open_lines(&self, request: UpstreamRequest) -> Result<LineStream, YuanbaoError>;
}

/// HTTP client for the Yuanbao chat API.
pub struct YuanbaoClient {
    client: reqwest::Client,
    config: YuanbaoClientConfig,
}

impl YuanbaoClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: YuanbaoClientConfig) -> Result<Self, YuanbaoError> {
        if config.base_url.trim().is_empty() {
            return Err(YuanbaoError::Config("base_url must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| YuanbaoError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a client configured from the environment.
    pub fn from_env() -> Result<Self, YuanbaoError> {
        Self::new(YuanbaoClientConfig::from_env()?)
    }

    pub fn config(&self) -> &YuanbaoClientConfig {
        &self.config
    }

    fn post(&self, url: String, credentials: &SessionCredentials) -> reqwest::RequestBuilder {
        let mut req = self.client.post(url);
        for (name, value) in build_headers(&self.config, credentials) {
            req = req.header(name, value);
        }
        req
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, YuanbaoError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(YuanbaoError::Upstream {
        status: status.as_u16(),
        body,
    })
}

#[async_trait::async_trait]
impl UpstreamSession for YuanbaoClient {
    async fn create_conversation(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<String, YuanbaoError> {
        credentials.validate()?;
        let response = self
            .post(self.config.create_conversation_url(), credentials)
            .json(&serde_json::json!({ "agentId": credentials.agent_id }))
            .send()
            .await
            .map_err(|e| YuanbaoError::transport("conversation request failed", e))?;
        let body: serde_json::Value = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| YuanbaoError::Protocol(format!("invalid conversation response: {e}")))?;
        let chat_id = body
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| YuanbaoError::Protocol("conversation response has no id".into()))?;
        info!(chat_id, agent_id = %credentials.agent_id, "created upstream conversation");
        Ok(chat_id.to_string())
    }

    async fn open_lines(&self, request: UpstreamRequest) -> Result<LineStream, YuanbaoError> {
        request.credentials.validate()?;
        if request.chat_id.trim().is_empty() {
            return Err(YuanbaoError::Validation("chat_id must not be empty".into()));
        }
        let body = build_chat_body(&request);
        debug!(
            chat_id = %request.chat_id,
            model = %request.model.name,
            prompt_len = request.prompt.len(),
            "opening upstream chat stream"
        );

        let response = self
            .post(self.config.chat_url(&request.chat_id), &request.credentials)
            .json(&body)
            .send()
            .await
            .map_err(|e| YuanbaoError::transport("chat request failed", e))?;
        let response = ensure_success(response).await?;

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(Box::pin(chatrelay_core::lines_from_bytes(bytes_stream)))
    }
}

/// Builds the JSON body of an upstream chat request.
pub fn build_chat_body(request: &UpstreamRequest) -> serde_json::Value {
    serde_json::json!({
        "model": request.model.model,
        "prompt": request.prompt,
        "plugin": "Adaptive",
        "displayPrompt": request.prompt,
        "displayPromptType": 1,
        "options": {
            "imageIntention": {
                "needIntentionModel": true,
                "backendUpdateFlag": 2,
                "intentionStatus": true
            }
        },
        "multimedia": [],
        "agentId": request.credentials.agent_id,
        "supportHint": 1,
        "version": "v2",
        "chatModelId": request.model.chat_model_id,
        "supportFunctions": request.model.support_functions
    })
}
