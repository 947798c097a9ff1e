use std::time::Duration;

use crate::errors::YuanbaoError;

/// Browser user agent presented to the upstream.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

/// Configuration for the Yuanbao upstream client.
#[derive(Clone, Debug)]
pub struct YuanbaoClientConfig {
    /// Site origin; also used for the `Origin` and `Referer` headers.
    ///
    /// Point it at a local server in tests.
    pub base_url: String,
    /// HTTP timeout for a whole request, body included.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for YuanbaoClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://yuanbao.tencent.com".to_string(),
            timeout: Duration::from_secs(120),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl YuanbaoClientConfig {
    /// Builds a config from `YUANBAO_BASE_URL` and `YUANBAO_TIMEOUT_SECS`,
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, YuanbaoError> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("YUANBAO_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url;
        }
        if let Ok(raw) = std::env::var("YUANBAO_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                YuanbaoError::Config(format!("YUANBAO_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Overrides the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub(crate) fn chat_url(&self, chat_id: &str) -> String {
        format!("{}/api/chat/{chat_id}", self.origin())
    }

    pub(crate) fn create_conversation_url(&self) -> String {
        format!("{}/api/user/agent/conversation/create", self.origin())
    }
}
