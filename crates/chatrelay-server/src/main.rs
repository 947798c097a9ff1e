use std::sync::Arc;

use chatrelay_core::init_observability;
use chatrelay_server::{Cli, build_router, config};
use chatrelay_yuanbao::YuanbaoClient;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::load_dotenv();
    let cli = Cli::parse();
    init_observability();

    let client = YuanbaoClient::new(cli.client_config())?;
    tracing::info!(upstream = %client.config().base_url, "upstream configured");
    let app = build_router(Arc::new(client));

    let addr = cli.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "chatrelay listening");

    axum::serve(listener, app).await?;
    Ok(())
}
