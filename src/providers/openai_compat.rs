//! The bundled OpenAI-compatible [`Provider`]: talks to LM Studio, Ollama,
//! llama.cpp, vLLM, or OpenAI itself over the `/chat/completions` wire format.
//!
//! The wire structs below (`WireMessage`, `WireChunk`, `WireToolCallDelta`,
//! ...) mirror the `/chat/completions` JSON shape directly. SSE framing goes
//! through the `eventsource-stream` crate rather than a hand-rolled `data: `
//! line scanner, and delta aggregation goes through
//! [`crate::assembler::ToolCallAssembler`].

use crate::assembler::{StreamDelta, ToolCallAssembler, ToolCallDelta};
use crate::chat::{ChatRequest, ChatResponse};
use crate::config::ServerPreset;
use crate::content::{ContentPart, FileSource, Message, MessageRole, ToolCall, ToolResult};
use crate::error::{Cause, ProviderError};
use crate::provider::Provider;
use crate::stream::ChatStream;
use crate::tools::ToolSpec;
use crate::usage::{Feature, ModelInfo, Usage};
use crate::{Error, Result};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

const PROVIDER_ID: &str = "openai-compat";

/// Talks to any server exposing the OpenAI chat-completions API.
pub struct OpenAiCompatProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    known_models: Vec<ModelInfo>,
    empty_arguments_json: Option<String>,
}

impl OpenAiCompatProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
            known_models: Vec::new(),
            empty_arguments_json: None,
        }
    }

    /// Sets the JSON substituted for a streamed tool call whose arguments
    /// never accumulated any fragments. Unset by default: such a call fails
    /// assembly with `invalid-tool-args` rather than silently defaulting.
    pub fn with_empty_arguments_json(mut self, json: impl Into<String>) -> Self {
        self.empty_arguments_json = Some(json.into());
        self
    }

    /// Convenience constructor for one of the well-known local servers.
    pub fn with_preset(preset: ServerPreset) -> Self {
        Self::new(preset.default_url())
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Advertises a model this endpoint is known to serve. Purely
    /// descriptive: `chat`/`stream_chat` accept any model id regardless.
    pub fn with_known_model(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.known_models.push(ModelInfo {
            display_name: id.clone(),
            id,
            capabilities: vec![Feature::Chat, Feature::ChatStreaming, Feature::ToolCalling],
            api_endpoint: self.base_url.clone(),
        });
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn provider_error(&self, status: u16, body: String) -> Error {
        Error::Provider(
            ProviderError::new(PROVIDER_ID, ProviderError::cause_for_status(status), body).with_http_status(status),
        )
    }
}

// ---------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    choices: Vec<WireChunkChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    delta: WireDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<WireFunctionDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct WireFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

fn message_role_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

fn content_part_to_wire(part: &ContentPart) -> Value {
    match part {
        ContentPart::InputText { text } => serde_json::json!({"type": "text", "text": text}),
        ContentPart::InputImage { source, .. } => {
            let url = match source {
                FileSource::Url { url } => url.clone(),
                FileSource::FileId { file_id } => file_id.clone(),
                FileSource::Base64 { data, filename } => format!("data:image/*;base64,{data};name={filename}"),
            };
            serde_json::json!({"type": "image_url", "image_url": {"url": url}})
        }
        ContentPart::InputFile { source } => {
            let url = match source {
                FileSource::Url { url } => url.clone(),
                FileSource::FileId { file_id } => file_id.clone(),
                FileSource::Base64 { data, filename } => format!("data:application/octet-stream;base64,{data};name={filename}"),
            };
            serde_json::json!({"type": "text", "text": url})
        }
    }
}

fn message_to_wire(message: &Message) -> Vec<WireMessage> {
    let role = message_role_str(message.role).to_string();

    if message.role == MessageRole::Tool {
        return message
            .tool_results
            .as_ref()
            .into_iter()
            .flatten()
            .map(|result| WireMessage {
                role: role.clone(),
                content: Some(Value::String(result.content_as_text())),
                tool_calls: None,
                tool_call_id: Some(result.call_id.clone()),
            })
            .collect();
    }

    let content = if !message.content_parts.is_empty() {
        Some(Value::Array(message.content_parts.iter().map(content_part_to_wire).collect()))
    } else {
        message.text.clone().map(Value::String)
    };

    let tool_calls = message.tool_calls.as_ref().map(|calls| {
        calls
            .iter()
            .map(|call| WireToolCall {
                id: call.id.clone(),
                call_type: "function".to_string(),
                function: WireFunction { name: call.name.clone(), arguments: call.arguments.clone() },
            })
            .collect()
    });

    vec![WireMessage { role, content, tool_calls, tool_call_id: None }]
}

fn tool_spec_to_wire(spec: &ToolSpec) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.parameters,
        }
    })
}

fn to_wire_request(request: &ChatRequest, stream: bool) -> WireRequest {
    let mut messages: Vec<WireMessage> = request.messages.iter().flat_map(message_to_wire).collect();
    if let Some(instructions) = &request.instructions {
        messages.insert(0, WireMessage {
            role: "system".to_string(),
            content: Some(Value::String(instructions.clone())),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(request.tools.iter().map(tool_spec_to_wire).collect())
    };

    WireRequest {
        model: request.model.clone(),
        messages,
        stream,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        tools,
    }
}

fn wire_tool_calls_to_calls(calls: Vec<WireToolCall>) -> Vec<ToolCall> {
    calls.into_iter().map(|c| ToolCall::new(c.id, c.function.name, c.function.arguments)).collect()
}

fn wire_usage_to_usage(usage: Option<WireUsage>) -> Usage {
    match usage {
        Some(u) => Usage { prompt: u.prompt_tokens, completion: u.completion_tokens, total: u.total_tokens },
        None => Usage::default(),
    }
}

fn to_chat_response(wire: WireResponse) -> Result<ChatResponse> {
    let choice = wire
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Provider(ProviderError::new(PROVIDER_ID, Cause::Decode, "response had no choices")))?;

    Ok(ChatResponse {
        id: wire.id,
        model: wire.model,
        output_text: choice.message.content.unwrap_or_default(),
        usage: wire_usage_to_usage(wire.usage),
        tool_calls: choice.message.tool_calls.map(wire_tool_calls_to_calls).unwrap_or_default(),
        reasoning: None,
        status: None,
    })
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn models(&self) -> Vec<ModelInfo> {
        self.known_models.clone()
    }

    fn supports(&self, feature: Feature) -> bool {
        matches!(feature, Feature::Chat | Feature::ChatStreaming | Feature::ToolCalling)
    }

    async fn chat(&self, ctx: CancellationToken, request: ChatRequest) -> Result<ChatResponse> {
        let model = request.model.clone();
        let wire_request = to_wire_request(&request, false);
        let send = self.authed(self.http.post(self.endpoint()).json(&wire_request)).send();

        let response = tokio::select! {
            _ = ctx.cancelled() => return Err(Error::Canceled),
            result = send => result.map_err(Error::Http)?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.provider_error(status.as_u16(), body));
        }

        let mut wire: WireResponse = response.json().await.map_err(Error::Http)?;
        if wire.model.is_empty() {
            wire.model = model;
        }
        to_chat_response(wire)
    }

    async fn stream_chat(&self, ctx: CancellationToken, request: ChatRequest) -> Result<ChatStream> {
        let model = request.model.clone();
        let wire_request = to_wire_request(&request, true);
        let send = self.authed(self.http.post(self.endpoint()).json(&wire_request)).send();

        let response = tokio::select! {
            _ = ctx.cancelled() => return Err(Error::Canceled),
            result = send => result.map_err(Error::Http)?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.provider_error(status.as_u16(), body));
        }

        let (sink, stream) = ChatStream::channel(crate::stream::DEFAULT_DELTA_BUFFER);
        let provider_id = self.id().to_string();
        let empty_arguments_json = self.empty_arguments_json.clone();

        tokio::spawn(async move {
            let mut events = response.bytes_stream().eventsource();
            let mut assembler = ToolCallAssembler::new();
            if let Some(json) = empty_arguments_json {
                assembler = assembler.with_empty_arguments_json(json);
            }
            let mut usage = Usage::default();
            let mut response_id = String::new();

            loop {
                let event = tokio::select! {
                    _ = ctx.cancelled() => {
                        sink.finish_error(ProviderError::new(&provider_id, Cause::Canceled, "canceled"));
                        return;
                    }
                    event = events.next() => event,
                };

                let Some(event) = event else { break };
                let event = match event {
                    Ok(e) => e,
                    Err(err) => {
                        sink.finish_error(ProviderError::new(&provider_id, Cause::Network, err.to_string()));
                        return;
                    }
                };

                if event.data == "[DONE]" {
                    break;
                }

                let chunk: WireChunk = match serde_json::from_str(&event.data) {
                    Ok(c) => c,
                    Err(err) => {
                        sink.finish_error(ProviderError::new(&provider_id, Cause::Decode, err.to_string()));
                        return;
                    }
                };

                if !event.id.is_empty() {
                    response_id = event.id.clone();
                }
                if let Some(u) = chunk.usage {
                    usage = Usage { prompt: u.prompt_tokens, completion: u.completion_tokens, total: u.total_tokens };
                }

                for choice in chunk.choices {
                    let finished = choice.finish_reason.is_some();
                    let tool_call_deltas = choice
                        .delta
                        .tool_calls
                        .unwrap_or_default()
                        .into_iter()
                        .map(|d| ToolCallDelta {
                            index: d.index,
                            id: d.id,
                            name: d.function.as_ref().and_then(|f| f.name.clone()),
                            arguments_fragment: d.function.and_then(|f| f.arguments),
                        })
                        .collect();

                    let delta = StreamDelta { text: choice.delta.content, tool_call_deltas, finished };
                    if !sink_forward(&sink, delta.clone()).await {
                        return;
                    }

                    let assembled = match assembler.process_delta(delta) {
                        Ok(a) => a,
                        Err(err) => {
                            sink.finish_error(ProviderError::new(&provider_id, Cause::InvalidToolArgs, err.to_string()));
                            return;
                        }
                    };
                    if let Some((text, calls)) = assembled {
                        sink.finish_ok(ChatResponse {
                            id: response_id.clone(),
                            model: model.clone(),
                            output_text: text,
                            usage,
                            tool_calls: calls,
                            reasoning: None,
                            status: None,
                        });
                        return;
                    }
                }
            }

            // Stream closed without an explicit finish_reason; flush whatever
            // the assembler accumulated as a best-effort final response.
            let assembled = assembler.process_delta(StreamDelta { finished: true, ..Default::default() });
            match assembled {
                Ok(Some((text, calls))) => sink.finish_ok(ChatResponse {
                    id: response_id,
                    model,
                    output_text: text,
                    usage,
                    tool_calls: calls,
                    reasoning: None,
                    status: None,
                }),
                _ => sink.finish_error(ProviderError::new(&provider_id, Cause::Decode, "stream ended without finish_reason")),
            }
        });

        Ok(stream)
    }
}

async fn sink_forward(sink: &crate::stream::ChatStreamSink, delta: StreamDelta) -> bool {
    sink.send_delta(delta).await
}
