//! The agent loop: budgets, lifecycle hooks, tool dispatch, auto-summarizing
//! memory, and snapshot/resume, built on top of [`crate::client::Client`].
//!
//! The model-call/tool-dispatch/feedback cycle lives here as a standalone,
//! resumable state machine, keeping `Client`/`Provider` agent-agnostic.

pub mod config;
pub mod dispatch;
pub mod hooks;
pub mod memory;
pub mod runner;
pub mod state;

pub use config::{AgentConfig, MemoryConfig, ToolFilter};
pub use hooks::{
    AgentCompleteEvent, AgentHooks, IterationEndEvent, IterationStartEvent, StopReason,
    SummarizeEvent, ToolCallEndEvent, ToolCallStartEvent,
};
pub use runner::Runner;
pub use state::{AgentResult, AgentSnapshot, AgentState, ToolExecution, SNAPSHOT_VERSION};
