//! The `Provider` trait: the backend contract every LLM adapter satisfies.
//!
//! Rather than hard-wiring one OpenAI-compatible backend behind `Client`'s
//! public methods, that surface is pulled out into a trait so
//! [`crate::client::Client`] can wrap any backend uniformly;
//! `providers::openai_compat` supplies the concrete adapter.

use crate::chat::{ChatRequest, ChatResponse};
use crate::stream::ChatStream;
use crate::usage::{Feature, ModelInfo};
use crate::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A chat backend: OpenAI, Anthropic, a local server, or a test double.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A stable identifier used in error attribution and telemetry.
    fn id(&self) -> &str;

    /// Models this provider exposes, with their declared capabilities.
    fn models(&self) -> Vec<ModelInfo>;

    /// Whether this provider supports a given capability, independent of model.
    fn supports(&self, feature: Feature) -> bool;

    /// A single non-streaming chat turn. `ctx` cancels the underlying request.
    async fn chat(&self, ctx: CancellationToken, request: ChatRequest) -> Result<ChatResponse>;

    /// A streaming chat turn; see [`crate::stream::ChatStream`] for the
    /// three-channel output contract. `ctx` cancels the underlying request.
    async fn stream_chat(&self, ctx: CancellationToken, request: ChatRequest) -> Result<ChatStream>;
}
