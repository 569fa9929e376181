//! Fluent, single-owner request builder.
//!
//! Rather than assembling a message vector by hand on every call, this
//! builder is reusable and clonable, so the agent runner can mutate and
//! re-send the same growing conversation across iterations without
//! re-deriving it from scratch.

use crate::chat::{BuiltInTool, ChatRequest, ChatResponse};
use crate::client::Client;
use crate::content::{ContentPart, Message};
use crate::stream::ChatStream;
use crate::tools::ToolSpec;
use crate::usage::ReasoningEffort;
use crate::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builds one [`ChatRequest`] against a fixed [`Client`] + model pair.
///
/// Not thread-safe; single-owner. Callers that need to branch a shared
/// prefix into multiple continuations should `clone`.
#[derive(Clone)]
pub struct ChatRequestBuilder {
    client: Arc<Client>,
    model: String,
    messages: Vec<Message>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    tools: Vec<ToolSpec>,
    instructions: Option<String>,
    reasoning_effort: Option<ReasoningEffort>,
    built_in_tools: Vec<BuiltInTool>,
    previous_response_id: Option<String>,
    tool_resources: Vec<String>,
    pending_parts: Option<Vec<ContentPart>>,
}

impl ChatRequestBuilder {
    pub(crate) fn new(client: Arc<Client>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
            instructions: None,
            reasoning_effort: None,
            built_in_tools: Vec::new(),
            previous_response_id: None,
            tool_resources: Vec::new(),
            pending_parts: None,
        }
    }

    pub fn system(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message::system(text));
        self
    }

    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message::user(text));
        self
    }

    pub fn assistant(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message::assistant(text));
        self
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn append_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn temperature(mut self, value: f32) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn max_tokens(mut self, value: u32) -> Self {
        self.max_tokens = Some(value);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.instructions = Some(text.into());
        self
    }

    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn built_in_tool(mut self, tool: BuiltInTool) -> Self {
        self.built_in_tools.push(tool);
        self
    }

    pub fn previous_response_id(mut self, id: impl Into<String>) -> Self {
        self.previous_response_id = Some(id.into());
        self
    }

    pub fn tool_resource(mut self, vector_store_id: impl Into<String>) -> Self {
        self.tool_resources.push(vector_store_id.into());
        self
    }

    /// Starts a multimodal user message. Append parts with [`Self::part`],
    /// then [`Self::seal_message`] to push it onto the conversation.
    pub fn start_multimodal_message(mut self) -> Self {
        self.pending_parts = Some(Vec::new());
        self
    }

    pub fn part(mut self, part: ContentPart) -> Self {
        self.pending_parts.get_or_insert_with(Vec::new).push(part);
        self
    }

    pub fn seal_message(mut self) -> Self {
        if let Some(parts) = self.pending_parts.take() {
            self.messages.push(Message::user_with_parts(parts));
        }
        self
    }

    pub fn messages_ref(&self) -> &[Message] {
        &self.messages
    }

    fn build_request(&self) -> Result<ChatRequest> {
        if self.model.is_empty() {
            return Err(Error::model_required());
        }
        if self.messages.is_empty() || !self.messages.iter().all(Message::is_valid) {
            return Err(Error::no_messages());
        }
        Ok(ChatRequest {
            model: self.model.clone(),
            messages: self.messages.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.tools.clone(),
            instructions: self.instructions.clone(),
            reasoning_effort: self.reasoning_effort,
            built_in_tools: self.built_in_tools.clone(),
            previous_response_id: self.previous_response_id.clone(),
            tool_resources: self.tool_resources.clone(),
        })
    }

    /// Validates, emits request telemetry, and invokes the provider under
    /// the client's retry policy.
    pub async fn get_response(&self, ctx: CancellationToken) -> Result<ChatResponse> {
        let request = self.build_request()?;
        self.client.execute_chat(ctx, request).await
    }

    /// Validates, emits `request-start`, and invokes the provider's
    /// streaming call. No retry is applied to streams.
    pub async fn stream(&self, ctx: CancellationToken) -> Result<ChatStream> {
        let request = self.build_request()?;
        self.client.execute_stream_chat(ctx, request).await
    }
}
