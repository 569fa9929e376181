//! Single-tool agent: the model asks for a city's weather, a local handler
//! answers with canned data, the runner feeds the result back and produces
//! a final answer.
//!
//! Run against any OpenAI-compatible server (LM Studio, Ollama, llama.cpp,
//! vLLM):
//!
//! ```sh
//! OPEN_AGENT_BASE_URL=http://localhost:1234/v1 cargo run --example weather_agent
//! ```

use agent_runtime_core::agent::Runner;
use agent_runtime_core::config::{get_base_url, get_model, ServerPreset};
use agent_runtime_core::providers::OpenAiCompatProvider;
use agent_runtime_core::tools::{tool, ToolRegistry};
use agent_runtime_core::Client;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let base_url = get_base_url(Some(ServerPreset::LMStudio), None);
    let model = get_model(Some("qwen2.5-32b-instruct"), true).unwrap();

    let provider = Arc::new(OpenAiCompatProvider::new(base_url));
    let client = Arc::new(Client::new(provider));

    let weather_tool = tool("get_weather", "Look up the current weather for a city")
        .param("city", "string")
        .build(|args| async move {
            let city = args
                .get("city")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            Ok(json!({ "city": city, "conditions": "sunny", "temp_c": 22 }))
        });

    let registry = Arc::new(ToolRegistry::new().register(weather_tool));

    let runner = Runner::new(client, model, registry.clone())
        .with_tools(registry.specs())
        .with_system_prompt("You are a helpful weather assistant. Use the get_weather tool when asked about conditions in a city.");

    let result = runner
        .run(CancellationToken::new(), "What's the weather like in Lisbon right now?")
        .await;

    println!("stop reason: {:?}", result.stop_reason);
    println!("iterations: {}", result.iterations);
    println!("tool calls: {}", result.total_tool_calls);
    println!("{}", result.output_text);

    Ok(())
}
