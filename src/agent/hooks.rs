//! Agent lifecycle hooks: iteration and tool-call boundaries.
//!
//! The event set is iteration-oriented rather than tool-call-oriented: an
//! `Arc<dyn Fn(...) -> Pin<Box<dyn Future<...>>>>` per callback, registered
//! fluently. Two events (`on_iteration_start`, `on_tool_call_start`) can veto
//! by returning an error, aborting the loop or skipping that one call.

use crate::chat::ChatResponse;
use crate::content::{ToolCall, ToolResult};
use crate::usage::Usage;
use crate::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Why the agent loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Complete,
    MaxIterations,
    MaxToolCalls,
    StopSequence,
    HookAbort,
    Canceled,
    Error,
}

#[derive(Debug, Clone)]
pub struct IterationStartEvent {
    pub iteration: u32,
    pub message_count: usize,
}

#[derive(Debug, Clone)]
pub struct IterationEndEvent {
    pub iteration: u32,
    pub duration: Duration,
    pub response: ChatResponse,
    pub usage: Usage,
}

#[derive(Debug, Clone)]
pub struct ToolCallStartEvent {
    pub iteration: u32,
    pub call: ToolCall,
}

#[derive(Debug, Clone)]
pub struct ToolCallEndEvent {
    pub iteration: u32,
    pub call: ToolCall,
    pub result: ToolResult,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct AgentCompleteEvent {
    pub reason: StopReason,
    pub iterations: u32,
    pub total_tool_calls: u32,
    pub duration: Duration,
}

/// Fired after an auto-summarization pass rewrites the message history.
#[derive(Debug, Clone)]
pub struct SummarizeEvent {
    pub original_tokens: u64,
    pub summarized_tokens: u64,
    pub messages_removed: usize,
    pub summary: String,
}

type VetoHandler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = Option<Error>> + Send>> + Send + Sync>;
type NotifyHandler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;
type DeltaHandler = Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Container for all agent lifecycle hooks, added fluently.
#[derive(Clone, Default)]
pub struct AgentHooks {
    iteration_start: Vec<VetoHandler<IterationStartEvent>>,
    iteration_end: Vec<NotifyHandler<IterationEndEvent>>,
    tool_call_start: Vec<VetoHandler<ToolCallStartEvent>>,
    tool_call_end: Vec<NotifyHandler<ToolCallEndEvent>>,
    agent_complete: Vec<NotifyHandler<AgentCompleteEvent>>,
    text_delta: Vec<DeltaHandler>,
    summarize: Vec<NotifyHandler<SummarizeEvent>>,
}

impl AgentHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_iteration_start<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(IterationStartEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Error>> + Send + 'static,
    {
        self.iteration_start.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn on_iteration_end<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(IterationEndEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.iteration_end.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn on_tool_call_start<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ToolCallStartEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Error>> + Send + 'static,
    {
        self.tool_call_start.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn on_tool_call_end<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ToolCallEndEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tool_call_end.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn on_agent_complete<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(AgentCompleteEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.agent_complete.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    /// Fires only during `run_stream`.
    pub fn on_text_delta<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.text_delta.push(Arc::new(move |delta| Box::pin(handler(delta))));
        self
    }

    pub fn on_summarize<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(SummarizeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.summarize.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub(crate) async fn fire_iteration_start(&self, event: IterationStartEvent) -> Option<Error> {
        for handler in &self.iteration_start {
            if let Some(err) = handler(event.clone()).await {
                return Some(err);
            }
        }
        None
    }

    pub(crate) async fn fire_iteration_end(&self, event: IterationEndEvent) {
        for handler in &self.iteration_end {
            handler(event.clone()).await;
        }
    }

    pub(crate) async fn fire_tool_call_start(&self, event: ToolCallStartEvent) -> Option<Error> {
        for handler in &self.tool_call_start {
            if let Some(err) = handler(event.clone()).await {
                return Some(err);
            }
        }
        None
    }

    pub(crate) async fn fire_tool_call_end(&self, event: ToolCallEndEvent) {
        for handler in &self.tool_call_end {
            handler(event.clone()).await;
        }
    }

    pub(crate) async fn fire_agent_complete(&self, event: AgentCompleteEvent) {
        for handler in &self.agent_complete {
            handler(event.clone()).await;
        }
    }

    pub(crate) async fn fire_text_delta(&self, delta: String) {
        for handler in &self.text_delta {
            handler(delta.clone()).await;
        }
    }

    pub(crate) async fn fire_summarize(&self, event: SummarizeEvent) {
        for handler in &self.summarize {
            handler(event.clone()).await;
        }
    }
}

impl std::fmt::Debug for AgentHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHooks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_iteration_start_veto() {
        let hooks = AgentHooks::new().on_iteration_start(|_event| async { Some(Error::other("blocked")) });
        let result = hooks
            .fire_iteration_start(IterationStartEvent { iteration: 0, message_count: 1 })
            .await;
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_no_hooks_is_no_op() {
        let hooks = AgentHooks::new();
        assert!(hooks
            .fire_iteration_start(IterationStartEvent { iteration: 0, message_count: 1 })
            .await
            .is_none());
    }
}
