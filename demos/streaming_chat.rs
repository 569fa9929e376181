//! Plain single-request streaming, printing text deltas as they arrive and
//! then the assembled final response once the stream finishes.

use agent_runtime_core::config::{get_base_url, get_model, ServerPreset};
use agent_runtime_core::providers::OpenAiCompatProvider;
use agent_runtime_core::Client;
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let base_url = get_base_url(Some(ServerPreset::LMStudio), None);
    let model = get_model(Some("qwen2.5-32b-instruct"), true).unwrap();

    let provider = Arc::new(OpenAiCompatProvider::new(base_url));
    let client = Arc::new(Client::new(provider));

    let mut stream = client
        .chat(model)
        .system("You are a concise assistant.")
        .user("Write two sentences about the history of the compass.")
        .stream(CancellationToken::new())
        .await?;

    while let Some(delta) = stream.next_delta().await {
        if let Some(text) = delta.text {
            print!("{text}");
            std::io::stdout().flush().ok();
        }
    }
    println!();

    let response = agent_runtime_core::drain_stream(stream).await?;
    println!("--- usage: {:?}", response.usage);

    Ok(())
}
