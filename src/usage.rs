//! Auxiliary types: token usage, model metadata, capability flags, reasoning output.

use serde::{Deserialize, Serialize};

/// Token accounting for a single chat response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl Usage {
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }
}

/// A coarse "thinking budget" knob passed to backends that expose one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    None,
    Low,
    Medium,
    High,
    Xhigh,
}

/// Reasoning trace a backend may return alongside its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reasoning {
    pub id: String,
    pub summary: Vec<String>,
}

/// A capability a [`crate::provider::Provider`] may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Chat,
    ChatStreaming,
    ToolCalling,
    Reasoning,
    BuiltinTools,
    ResponseChain,
    Embeddings,
    ContextualizedEmbeddings,
    Reranking,
    ImageGeneration,
}

/// Static metadata about a model a provider exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
    pub capabilities: Vec<Feature>,
    pub api_endpoint: String,
}
