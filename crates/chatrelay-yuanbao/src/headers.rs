use std::collections::BTreeMap;

use crate::config::YuanbaoClientConfig;
use crate::session::SessionCredentials;

/// Builds the upstream request headers for a browser session.
pub fn build_headers(
    config: &YuanbaoClientConfig,
    credentials: &SessionCredentials,
) -> BTreeMap<&'static str, String> {
    let origin = config.origin();
    BTreeMap::from([
        (
            "Cookie",
            format!(
                "hy_source={}; hy_user={}; hy_token={}",
                credentials.hy_source, credentials.hy_user, credentials.hy_token
            ),
        ),
        ("Origin", origin.to_string()),
        ("Referer", format!("{origin}/chat/{}", credentials.agent_id)),
        ("X-Agentid", credentials.agent_id.clone()),
        ("User-Agent", config.user_agent.clone()),
    ])
}
