//! `AgentConfig` / `MemoryConfig`: budgets, timeouts, and dispatch policy.

use crate::agent::hooks::AgentHooks;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a tool name is allowed to run.
pub type ToolFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Memory auto-summarization settings.
#[derive(Clone)]
pub struct MemoryConfig {
    pub max_tokens: u64,
    pub threshold: f64,
    pub preserve_last_n: usize,
    pub summarization_prompt: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_tokens: 0,
            threshold: 0.8,
            preserve_last_n: 4,
            summarization_prompt: None,
        }
    }
}

impl std::fmt::Debug for MemoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConfig")
            .field("max_tokens", &self.max_tokens)
            .field("threshold", &self.threshold)
            .field("preserve_last_n", &self.preserve_last_n)
            .finish_non_exhaustive()
    }
}

/// Budgets, timeouts, and dispatch policy for one [`crate::agent::runner::Runner`].
#[derive(Clone)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub max_tool_calls: u32,
    pub iteration_timeout: Duration,
    pub tool_timeout: Duration,
    pub parallel_tools: bool,
    pub max_parallel_tools: usize,
    pub continue_on_tool_error: bool,
    pub stop_sequences: Vec<String>,
    pub tool_filter: Option<ToolFilter>,
    pub hooks: AgentHooks,
    pub memory_config: Option<MemoryConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_tool_calls: 50,
            iteration_timeout: Duration::from_secs(30),
            tool_timeout: Duration::from_secs(60),
            parallel_tools: true,
            max_parallel_tools: 5,
            continue_on_tool_error: true,
            stop_sequences: Vec::new(),
            tool_filter: None,
            hooks: AgentHooks::new(),
            memory_config: None,
        }
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("max_iterations", &self.max_iterations)
            .field("max_tool_calls", &self.max_tool_calls)
            .field("iteration_timeout", &self.iteration_timeout)
            .field("tool_timeout", &self.tool_timeout)
            .field("parallel_tools", &self.parallel_tools)
            .field("max_parallel_tools", &self.max_parallel_tools)
            .field("continue_on_tool_error", &self.continue_on_tool_error)
            .field("stop_sequences", &self.stop_sequences)
            .finish_non_exhaustive()
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_max_tool_calls(mut self, n: u32) -> Self {
        self.max_tool_calls = n;
        self
    }

    pub fn with_iteration_timeout(mut self, d: Duration) -> Self {
        self.iteration_timeout = d;
        self
    }

    pub fn with_tool_timeout(mut self, d: Duration) -> Self {
        self.tool_timeout = d;
        self
    }

    pub fn with_parallel_tools(mut self, enabled: bool) -> Self {
        self.parallel_tools = enabled;
        self
    }

    pub fn with_max_parallel_tools(mut self, n: usize) -> Self {
        self.max_parallel_tools = n;
        self
    }

    pub fn with_continue_on_tool_error(mut self, enabled: bool) -> Self {
        self.continue_on_tool_error = enabled;
        self
    }

    pub fn with_stop_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.stop_sequences.push(sequence.into());
        self
    }

    pub fn with_tool_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.tool_filter = Some(Arc::new(filter));
        self
    }

    pub fn with_hooks(mut self, hooks: AgentHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_memory_config(mut self, config: MemoryConfig) -> Self {
        self.memory_config = Some(config);
        self
    }

    /// A stable fingerprint of the budget/dispatch fields, recorded on a
    /// snapshot so `resume` can warn (but not refuse) on mismatch.
    pub fn config_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.max_iterations.hash(&mut hasher);
        self.max_tool_calls.hash(&mut hasher);
        self.parallel_tools.hash(&mut hasher);
        self.max_parallel_tools.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.max_tool_calls, 50);
        assert!(config.parallel_tools);
        assert_eq!(config.max_parallel_tools, 5);
    }

    #[test]
    fn test_config_hash_stable_for_equal_budgets() {
        let a = AgentConfig::new().with_max_iterations(5);
        let b = AgentConfig::new().with_max_iterations(5);
        assert_eq!(a.config_hash(), b.config_hash());
    }

    #[test]
    fn test_config_hash_differs_on_budget_change() {
        let a = AgentConfig::new().with_max_iterations(5);
        let b = AgentConfig::new().with_max_iterations(6);
        assert_ne!(a.config_hash(), b.config_hash());
    }

    #[test]
    fn test_tool_filter() {
        let config = AgentConfig::new().with_tool_filter(|name| name != "dangerous");
        let filter = config.tool_filter.unwrap();
        assert!(filter("safe"));
        assert!(!filter("dangerous"));
    }
}
