//! # agent-runtime-core
//!
//! A provider-agnostic, streaming-first Rust runtime for tool-calling LLM
//! agents: one `Provider` seam, parallel tool dispatch, auto-summarizing
//! memory, snapshot/resume, and a unified retry/error model.
//!
//! ## Two layers
//!
//! ### 1. `Client` — one request at a time
//!
//! ```rust,no_run
//! use agent_runtime_core::{Client, providers::OpenAiCompatProvider};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Arc::new(OpenAiCompatProvider::new("http://localhost:1234/v1"));
//!     let client = Arc::new(Client::new(provider));
//!
//!     let response = client
//!         .chat("qwen2.5-32b-instruct")
//!         .system("You are a helpful assistant")
//!         .user("What's the capital of France?")
//!         .get_response(CancellationToken::new())
//!         .await?;
//!
//!     println!("{}", response.output_text);
//!     Ok(())
//! }
//! ```
//!
//! ### 2. `agent::Runner` — the full iterate/dispatch/summarize loop
//!
//! ```rust,no_run
//! use agent_runtime_core::agent::Runner;
//! use agent_runtime_core::providers::OpenAiCompatProvider;
//! use agent_runtime_core::tools::ToolRegistry;
//! use agent_runtime_core::Client;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Arc::new(OpenAiCompatProvider::new("http://localhost:1234/v1"));
//!     let client = Arc::new(Client::new(provider));
//!     let tools = Arc::new(ToolRegistry::new());
//!
//!     let runner = Runner::new(client, "qwen2.5-32b-instruct", tools)
//!         .with_system_prompt("You are a helpful assistant");
//!     let result = runner.run(CancellationToken::new(), "What's 2+2?").await;
//!     println!("{}", result.output_text);
//!     Ok(())
//! }
//! ```
//!
//! ## Module map
//!
//! - [`provider`]: the `Provider` trait every backend implements.
//! - [`providers`]: the bundled OpenAI-compatible adapter (LM Studio, Ollama,
//!   llama.cpp, vLLM, or OpenAI itself).
//! - [`client`] / [`request`]: single-request execution with retry and telemetry.
//! - [`agent`]: the iterate/dispatch/summarize loop, lifecycle hooks, snapshot/resume.
//! - [`tools`]: tool definitions, JSON Schema generation, and the executor trait.
//! - [`content`] / [`chat`] / [`usage`]: provider-agnostic message and request/response types.
//! - [`stream`] / [`assembler`]: streaming delta channel and tool-call-delta assembly.
//! - [`conversation`]: a minimal in-memory message store for simple multi-turn use.
//! - [`retry`]: exponential backoff with jitter, shared by `Client` and callers.
//! - [`telemetry`]: content-free request-start/request-end notifications.
//! - [`config`]: endpoint/model resolution helpers for the bundled provider.
//! - [`error`]: the `Error`/`Result` types and the `Cause` retry-classification model.

pub mod agent;
pub mod assembler;
pub mod chat;
pub mod client;
pub mod config;
pub mod content;
pub mod conversation;
pub mod error;
pub mod provider;
pub mod providers;
pub mod request;
pub mod retry;
pub mod secret;
pub mod stream;
pub mod telemetry;
pub mod tools;
pub mod usage;

pub use chat::{BuiltInTool, ChatRequest, ChatResponse};
pub use client::Client;
pub use error::{Error, Result};
pub use provider::Provider;
pub use request::ChatRequestBuilder;
pub use secret::Secret;
pub use stream::{drain_stream, ChatStream, ChatStreamSink};
pub use tools::{Tool, ToolBuilder, ToolExecutor, ToolRegistry, ToolSpec};

/// Commonly used types for typical single-request or agent-loop usage.
///
/// `use agent_runtime_core::prelude::*;` pulls in `Client`, the `Provider`
/// trait, the bundled `OpenAiCompatProvider`, core message/tool types, the
/// agent `Runner` and its config/hooks, and `Error`/`Result`.
pub mod prelude {
    pub use crate::agent::{AgentConfig, AgentHooks, AgentResult, Runner, StopReason};
    pub use crate::chat::{ChatRequest, ChatResponse};
    pub use crate::client::Client;
    pub use crate::content::{Message, MessageRole, ToolCall, ToolResult};
    pub use crate::error::{Error, Result};
    pub use crate::provider::Provider;
    pub use crate::providers::OpenAiCompatProvider;
    pub use crate::tools::{Tool, ToolBuilder, ToolExecutor, ToolRegistry, ToolSpec, tool};
}
