//! Tool dispatch policy exercised through `Runner`: a blocked tool surfaces
//! as a per-call error without aborting the batch, and
//! `continue_on_tool_error = false` stops the loop on the first failure.

use agent_runtime_core::agent::{AgentConfig, Runner, StopReason};
use agent_runtime_core::chat::ChatResponse;
use agent_runtime_core::content::ToolCall;
use agent_runtime_core::provider::Provider;
use agent_runtime_core::stream::ChatStream;
use agent_runtime_core::tools::ToolExecutor;
use agent_runtime_core::usage::{Feature, ModelInfo, Usage};
use agent_runtime_core::{ChatRequest, Client, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

struct ScriptedProvider {
    responses: Mutex<Vec<ChatResponse>>,
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }
    fn models(&self) -> Vec<ModelInfo> {
        Vec::new()
    }
    fn supports(&self, _feature: Feature) -> bool {
        true
    }
    async fn chat(&self, _ctx: CancellationToken, request: ChatRequest) -> Result<ChatResponse> {
        let mut response = self.responses.lock().unwrap().remove(0);
        response.model = request.model;
        Ok(response)
    }
    async fn stream_chat(&self, _ctx: CancellationToken, _request: ChatRequest) -> Result<ChatStream> {
        unimplemented!()
    }
}

fn terminal(text: &str) -> ChatResponse {
    ChatResponse {
        id: "r".into(),
        model: "m".into(),
        output_text: text.into(),
        usage: Usage::new(1, 1),
        tool_calls: Vec::new(),
        reasoning: None,
        status: None,
    }
}

fn tool_calls(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        id: "r".into(),
        model: "m".into(),
        output_text: String::new(),
        usage: Usage::new(1, 1),
        tool_calls: calls,
        reasoning: None,
        status: None,
    }
}

struct EchoExecutor;
#[async_trait]
impl ToolExecutor for EchoExecutor {
    async fn execute(&self, _ctx: CancellationToken, _name: &str, args: &str) -> Result<Value> {
        Ok(serde_json::from_str(args).unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn tool_filter_blocks_disallowed_calls_without_aborting_the_batch() {
    let provider = Arc::new(ScriptedProvider {
        responses: Mutex::new(vec![
            tool_calls(vec![
                ToolCall::new("c1", "delete_everything", "{}"),
                ToolCall::new("c2", "echo", "{\"ok\":true}"),
            ]),
            terminal("done"),
        ]),
    });
    let client = Arc::new(Client::new(provider));
    let config = AgentConfig::new()
        .with_tool_filter(|name: &str| name != "delete_everything")
        .with_continue_on_tool_error(true);
    let runner = Runner::new(client, "m", Arc::new(EchoExecutor)).with_config(config);
    let result = runner.run(CancellationToken::new(), "hi").await;

    assert_eq!(result.stop_reason, StopReason::Complete);
    assert_eq!(result.total_tool_calls, 2);
    assert!(result.tool_history[0].result.is_error);
    assert!(!result.tool_history[1].result.is_error);
}

#[tokio::test]
async fn tool_error_stops_the_loop_when_continue_on_error_is_disabled() {
    struct FailingExecutor;
    #[async_trait]
    impl ToolExecutor for FailingExecutor {
        async fn execute(&self, _ctx: CancellationToken, _name: &str, _args: &str) -> Result<Value> {
            Err(agent_runtime_core::Error::tool("downstream unavailable"))
        }
    }

    let provider = Arc::new(ScriptedProvider {
        responses: Mutex::new(vec![tool_calls(vec![ToolCall::new("c1", "fails", "{}")])]),
    });
    let client = Arc::new(Client::new(provider));
    let config = AgentConfig::new().with_continue_on_tool_error(false);
    let runner = Runner::new(client, "m", Arc::new(FailingExecutor)).with_config(config);
    let result = runner.run(CancellationToken::new(), "hi").await;

    assert_eq!(result.stop_reason, StopReason::Error);
    assert!(result.error.is_some());
}
