use crate::errors::YuanbaoError;
use crate::models::UpstreamModelInfo;

/// One role-tagged chat message.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Browser session identifiers required by the upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCredentials {
    pub hy_source: String,
    pub hy_user: String,
    pub hy_token: String,
    pub agent_id: String,
}

impl SessionCredentials {
    /// Rejects credentials with empty fields.
    pub fn validate(&self) -> Result<(), YuanbaoError> {
        for (name, value) in [
            ("hy_source", &self.hy_source),
            ("hy_user", &self.hy_user),
            ("hy_token", &self.hy_token),
            ("agent_id", &self.agent_id),
        ] {
            if value.trim().is_empty() {
                return Err(YuanbaoError::Validation(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Everything needed to open one upstream chat stream.
#[derive(Clone, Debug)]
pub struct UpstreamRequest {
    pub chat_id: String,
    pub credentials: SessionCredentials,
    pub model: UpstreamModelInfo,
    /// Flattened prompt text.
    pub prompt: String,
}
