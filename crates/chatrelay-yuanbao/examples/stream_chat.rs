use chatrelay_core::{ChunkBuilder, OutputEvent, transcode_stream};
use chatrelay_yuanbao::{
    Message, SessionCredentials, UpstreamRequest, UpstreamSession, YuanbaoClient,
    flatten_messages, resolve_model,
};
use futures::StreamExt as _;

fn env(key: &str) -> Result<String, Box<dyn std::error::Error>> {
    std::env::var(key).map_err(|_| format!("missing {key}").into())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = YuanbaoClient::from_env()?;
    let credentials = SessionCredentials {
        hy_source: env("YUANBAO_HY_SOURCE")?,
        hy_user: env("YUANBAO_HY_USER")?,
        hy_token: env("YUANBAO_HY_TOKEN")?,
        agent_id: env("YUANBAO_AGENT_ID")?,
    };
    let model = resolve_model("deepseek-r1").ok_or("unknown model")?;
    let chat_id = client.create_conversation(&credentials).await?;

    let lines = client
        .open_lines(UpstreamRequest {
            chat_id,
            credentials,
            prompt: flatten_messages(&[Message::new("user", "Stream a short greeting.")]),
            model: model.clone(),
        })
        .await?;

    let mut events = std::pin::pin!(transcode_stream(lines, ChunkBuilder::new(model.name)));
    while let Some(event) = events.next().await {
        match event? {
            OutputEvent::Chunk(chunk) => print!("{}", chunk.content()),
            OutputEvent::Finish => println!(),
        }
    }
    Ok(())
}
