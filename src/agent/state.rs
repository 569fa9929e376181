//! `AgentState`, `AgentSnapshot`, `ToolExecution`, `AgentResult`.

use crate::agent::hooks::StopReason;
use crate::content::{Message, ToolCall, ToolResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// One recorded tool invocation, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub iteration: u32,
    pub call: ToolCall,
    pub result: ToolResult,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub timestamp_millis_since_start: u64,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Internal, mutable loop state. Exclusively owned by the runner; all
/// access is serialized through the runner's read/write lock.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub messages: Vec<Message>,
    pub iteration_count: u32,
    pub total_tool_calls: u32,
    pub tool_history: Vec<ToolExecution>,
    pub start_time: Instant,
    pub accumulated_tokens: u64,
}

impl AgentState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            iteration_count: 0,
            total_tool_calls: 0,
            tool_history: Vec::new(),
            start_time: Instant::now(),
            accumulated_tokens: 0,
        }
    }
}

/// The current schema version snapshots are serialized under.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Serializable projection of [`AgentState`], plus enough metadata to resume
/// safely: `version`, `elapsed_time`, and `config_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub version: String,
    pub messages: Vec<Message>,
    pub iteration_count: u32,
    pub total_tool_calls: u32,
    pub tool_history: Vec<ToolExecution>,
    pub accumulated_tokens: u64,
    #[serde(with = "duration_millis")]
    pub elapsed_time: Duration,
    pub config_hash: u64,
}

impl AgentSnapshot {
    pub(crate) fn from_state(state: &AgentState, config_hash: u64) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            messages: state.messages.clone(),
            iteration_count: state.iteration_count,
            total_tool_calls: state.total_tool_calls,
            tool_history: state.tool_history.clone(),
            accumulated_tokens: state.accumulated_tokens,
            elapsed_time: state.start_time.elapsed(),
            config_hash,
        }
    }

    /// Installs this snapshot as fresh `AgentState`, shifting `start_time`
    /// so elapsed time is preserved across the resume.
    pub(crate) fn into_state(self) -> AgentState {
        AgentState {
            messages: self.messages,
            iteration_count: self.iteration_count,
            total_tool_calls: self.total_tool_calls,
            tool_history: self.tool_history,
            start_time: Instant::now().checked_sub(self.elapsed_time).unwrap_or_else(Instant::now),
            accumulated_tokens: self.accumulated_tokens,
        }
    }
}

/// The outcome of a completed (or terminated) run.
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub output_text: String,
    pub stop_reason: StopReason,
    pub iterations: u32,
    pub total_tool_calls: u32,
    pub tool_history: Vec<ToolExecution>,
    pub messages: Vec<Message>,
    pub error: Option<String>,
}
