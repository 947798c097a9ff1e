use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chatrelay_yuanbao::YuanbaoClientConfig;
use clap::Parser;

/// Command-line and environment configuration for the relay server.
#[derive(Debug, Clone, Parser)]
#[command(name = "chatrelay", about = "OpenAI-compatible relay for Yuanbao chat")]
pub struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "CHATRELAY_HOST")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 8000, env = "CHATRELAY_PORT")]
    pub port: u16,

    /// Yuanbao site origin
    #[arg(long, default_value = "https://yuanbao.tencent.com", env = "YUANBAO_BASE_URL")]
    pub upstream_base_url: String,

    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = 120, env = "YUANBAO_TIMEOUT_SECS")]
    pub upstream_timeout_secs: u64,
}

impl Cli {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn client_config(&self) -> YuanbaoClientConfig {
        YuanbaoClientConfig::default()
            .base_url(self.upstream_base_url.clone())
            .timeout(Duration::from_secs(self.upstream_timeout_secs))
    }
}

/// Loads `.env` from the crate directory and the working directory, if present.
pub fn load_dotenv() {
    let _ = dotenvy::from_path(std::path::Path::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/.env"
    )));
    dotenvy::dotenv().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "chatrelay",
            "--port",
            "9001",
            "--upstream-base-url",
            "http://localhost:7000",
            "--upstream-timeout-secs",
            "5",
        ])
        .expect("parse");
        assert_eq!(cli.socket_addr().port(), 9001);
        let config = cli.client_config();
        assert_eq!(config.base_url, "http://localhost:7000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
