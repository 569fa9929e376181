//! Three independent lookups dispatched in the same iteration: the runner
//! executes them concurrently (bounded by `max_parallel_tools`) and feeds
//! all three results back before asking the model to continue.

use agent_runtime_core::agent::{AgentConfig, Runner};
use agent_runtime_core::config::{get_base_url, get_model, ServerPreset};
use agent_runtime_core::providers::OpenAiCompatProvider;
use agent_runtime_core::tools::{tool, ToolRegistry};
use agent_runtime_core::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let base_url = get_base_url(Some(ServerPreset::LMStudio), None);
    let model = get_model(Some("qwen2.5-32b-instruct"), true).unwrap();

    let provider = Arc::new(OpenAiCompatProvider::new(base_url));
    let client = Arc::new(Client::new(provider));

    let stock_price = tool("get_stock_price", "Look up a stock ticker's current price")
        .param("ticker", "string")
        .build(|args| async move {
            let ticker = args.get("ticker").and_then(|v| v.as_str()).unwrap_or("?").to_string();
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(json!({ "ticker": ticker, "price_usd": 142.37 }))
        });

    let exchange_rate = tool("get_exchange_rate", "Look up a currency pair's exchange rate")
        .param("pair", "string")
        .build(|args| async move {
            let pair = args.get("pair").and_then(|v| v.as_str()).unwrap_or("?").to_string();
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(json!({ "pair": pair, "rate": 1.08 }))
        });

    let news_headline = tool("get_news_headline", "Fetch the latest headline for a topic")
        .param("topic", "string")
        .build(|args| async move {
            let topic = args.get("topic").and_then(|v| v.as_str()).unwrap_or("?").to_string();
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(json!({ "topic": topic, "headline": "Markets steady ahead of earnings season" }))
        });

    let registry = Arc::new(
        ToolRegistry::new()
            .register(stock_price)
            .register(exchange_rate)
            .register(news_headline),
    );

    let config = AgentConfig::default()
        .with_parallel_tools(true)
        .with_max_parallel_tools(3)
        .with_max_tool_calls(10);

    let runner = Runner::new(client, model, registry.clone())
        .with_config(config)
        .with_tools(registry.specs())
        .with_system_prompt(
            "You have tools for stock prices, exchange rates, and news headlines. \
             Call whichever ones are relevant, then summarize the results.",
        );

    let result = runner
        .run(
            CancellationToken::new(),
            "Give me AAPL's price, the USD/EUR exchange rate, and the top tech headline.",
        )
        .await;

    println!("stop reason: {:?}", result.stop_reason);
    println!("tool calls dispatched: {}", result.total_tool_calls);
    for exec in &result.tool_history {
        println!(
            "  [{}] {} -> {:?} ({:?})",
            exec.iteration, exec.call.name, exec.result.content, exec.duration
        );
    }
    println!("{}", result.output_text);

    Ok(())
}
