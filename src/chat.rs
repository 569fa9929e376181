//! Provider-agnostic chat request/response types.

use crate::content::{Message, ToolCall};
use crate::tools::ToolSpec;
use crate::usage::{Reasoning, ReasoningEffort, Usage};
use serde::{Deserialize, Serialize};

/// A capability the backend itself provides (web search, file search, code
/// interpreter) as opposed to an executor-dispatched tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltInTool {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// A provider-agnostic chat request, produced by [`crate::request::ChatRequestBuilder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub built_in_tools: Vec<BuiltInTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_resources: Vec<String>,
}

/// A provider-agnostic chat response.
///
/// Invariant: if `tool_calls` is non-empty, this response is not terminal for
/// the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub output_text: String,
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ChatResponse {
    /// Whether the agent loop should treat this response as terminal.
    pub fn is_terminal(&self) -> bool {
        self.tool_calls.is_empty()
    }
}
