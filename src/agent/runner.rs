//! The agent runner: drives the iterate-call-dispatch-feedback loop.
//!
//! The loop repeatedly calls the model, executes any requested tools, feeds
//! the result back, and stops once a turn has no tool calls or a budget is
//! hit. Budgets split into iterations vs. tool calls, tool dispatch delegates
//! to [`crate::agent::dispatch::dispatch_batch`] (sequential or
//! semaphore-bounded parallel), every boundary fires a lifecycle hook, and
//! state is snapshot-able for resume.

use crate::agent::config::AgentConfig;
use crate::agent::dispatch::dispatch_batch;
use crate::agent::hooks::{AgentCompleteEvent, IterationEndEvent, IterationStartEvent, StopReason};
use crate::agent::memory::summarize_or_log;
use crate::agent::state::{AgentResult, AgentSnapshot, AgentState, ToolExecution, SNAPSHOT_VERSION};
use crate::client::Client;
use crate::content::Message;
use crate::stream::drain_stream;
use crate::tools::{ToolExecutor, ToolSpec};
use crate::usage::Usage;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Drives one conversation toward completion, dispatching tools as the model requests them.
///
/// Serializes its own state behind an internal `RwLock`: concurrent `run`
/// calls on the same runner are not meaningful (there is one conversation),
/// but `snapshot` may be called from another task while a run is paused at
/// an `await` point.
pub struct Runner {
    client: Arc<Client>,
    model: String,
    tools: Vec<ToolSpec>,
    executor: Arc<dyn ToolExecutor>,
    config: Arc<AgentConfig>,
    state: RwLock<AgentState>,
}

impl Runner {
    pub fn new(client: Arc<Client>, model: impl Into<String>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            client,
            model: model.into(),
            tools: Vec::new(),
            executor,
            config: Arc::new(AgentConfig::default()),
            state: RwLock::new(AgentState::new(Vec::new())),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Seeds the conversation with a system message. Only meaningful before
    /// the first `run`/`run_stream` call.
    pub fn with_system_prompt(self, text: impl Into<String>) -> Self {
        {
            let mut state = self.state.try_write().expect("runner not yet shared across tasks");
            state.messages.push(Message::system(text));
        }
        self
    }

    /// A point-in-time, serializable copy of the loop's internal state.
    pub async fn snapshot(&self) -> AgentSnapshot {
        let state = self.state.read().await;
        AgentSnapshot::from_state(&state, self.config.config_hash())
    }

    /// Replaces internal state with a previously captured snapshot.
    ///
    /// Rejects a snapshot whose `version` doesn't match [`SNAPSHOT_VERSION`];
    /// an unrecognized schema can't be safely interpreted. A mismatched
    /// `config_hash`, in contrast, only produces a warning, since budgets are
    /// allowed to change between a snapshot and its resume.
    pub async fn resume(&self, snapshot: AgentSnapshot) -> Result<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::config(format!(
                "unsupported snapshot version {:?}, expected {SNAPSHOT_VERSION:?}",
                snapshot.version
            )));
        }
        if snapshot.config_hash != self.config.config_hash() {
            warn!("resuming snapshot captured under a different agent configuration");
        }
        let mut state = self.state.write().await;
        *state = snapshot.into_state();
        Ok(())
    }

    /// Appends `user_text` and runs the loop to completion or budget exhaustion.
    pub async fn run(&self, ctx: CancellationToken, user_text: impl Into<String>) -> AgentResult {
        self.push_user_message(user_text).await;
        self.run_loop(ctx, false).await
    }

    /// As [`Self::run`], but each iteration streams and forwards text deltas
    /// to the `on_text_delta` hook as they arrive.
    pub async fn run_stream(&self, ctx: CancellationToken, user_text: impl Into<String>) -> AgentResult {
        self.push_user_message(user_text).await;
        self.run_loop(ctx, true).await
    }

    async fn push_user_message(&self, user_text: impl Into<String>) {
        let mut state = self.state.write().await;
        state.messages.push(Message::user(user_text));
    }

    async fn run_loop(&self, ctx: CancellationToken, streaming: bool) -> AgentResult {
        loop {
            match self.run_iteration(&ctx, streaming).await {
                IterationOutcome::Continue => continue,
                IterationOutcome::Stop(result) => return result,
            }
        }
    }

    async fn run_iteration(&self, ctx: &CancellationToken, streaming: bool) -> IterationOutcome {
        let iteration = {
            let state = self.state.read().await;
            state.iteration_count
        };

        if self.config.max_iterations > 0 && iteration >= self.config.max_iterations {
            return IterationOutcome::Stop(self.finish(StopReason::MaxIterations, None).await);
        }
        if ctx.is_cancelled() {
            return IterationOutcome::Stop(self.finish(StopReason::Canceled, None).await);
        }

        let message_count = self.state.read().await.messages.len();
        if let Some(err) = self
            .config
            .hooks
            .fire_iteration_start(IterationStartEvent { iteration, message_count })
            .await
        {
            return IterationOutcome::Stop(self.finish(StopReason::HookAbort, Some(err.to_string())).await);
        }

        let iteration_ctx = ctx.child_token();
        let iteration_start = Instant::now();
        let call_result = tokio::time::timeout(
            self.config.iteration_timeout,
            self.call_model(iteration_ctx, streaming),
        )
        .await;

        let response = match call_result {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return IterationOutcome::Stop(self.finish(StopReason::Error, Some(err.to_string())).await),
            Err(_) => {
                return IterationOutcome::Stop(
                    self.finish(StopReason::Error, Some(Error::DeadlineExceeded.to_string())).await,
                )
            }
        };

        {
            let mut state = self.state.write().await;
            state.iteration_count += 1;
            state.accumulated_tokens += response.usage.total;
        }

        self.config
            .hooks
            .fire_iteration_end(IterationEndEvent {
                iteration,
                duration: iteration_start.elapsed(),
                response: response.clone(),
                usage: response.usage,
            })
            .await;

        if let Some(sequence) = self
            .config
            .stop_sequences
            .iter()
            .find(|s| response.output_text.contains(s.as_str()))
        {
            info!("stopping on stop sequence {sequence:?}");
            self.append_assistant_text(&response.output_text).await;
            return IterationOutcome::Stop(self.finish(StopReason::StopSequence, None).await);
        }

        if response.is_terminal() {
            self.append_assistant_text(&response.output_text).await;
            return IterationOutcome::Stop(self.finish(StopReason::Complete, None).await);
        }

        let total_tool_calls = self.state.read().await.total_tool_calls;
        if self.config.max_tool_calls > 0
            && total_tool_calls + response.tool_calls.len() as u32 > self.config.max_tool_calls
        {
            self.append_assistant_text(&response.output_text).await;
            return IterationOutcome::Stop(self.finish(StopReason::MaxToolCalls, None).await);
        }

        let outcome = dispatch_batch(
            ctx.clone(),
            self.config.clone(),
            self.executor.clone(),
            iteration,
            response.tool_calls.clone(),
        )
        .await;

        // `dispatch_batch` already fires `tool_call_end` once per execution
        // (uniformly for both the sequential and parallel paths); firing it
        // again here would double-count every tool call.
        self.append_tool_round(&response.output_text, &response.tool_calls, &outcome.executions)
            .await;

        if let Some(message) = &outcome.first_error {
            if !self.config.continue_on_tool_error {
                return IterationOutcome::Stop(self.finish(StopReason::Error, Some(message.clone())).await);
            }
        }

        self.maintain_memory().await;

        IterationOutcome::Continue
    }

    async fn call_model(&self, ctx: CancellationToken, streaming: bool) -> Result<crate::ChatResponse> {
        let messages = self.state.read().await.messages.clone();
        let builder = self.client.chat(self.model.clone()).messages(messages).tools(self.tools.clone());

        if !streaming {
            return builder.get_response(ctx).await;
        }

        let mut stream = builder.stream(ctx).await?;
        let mut accumulated = String::new();
        while let Some(delta) = stream.next_delta().await {
            if let Some(text) = &delta.text {
                accumulated.push_str(text);
                self.config.hooks.fire_text_delta(text.clone()).await;
            }
            if delta.finished {
                break;
            }
        }
        // drain_stream expects to own the stream's remaining lifecycle (the
        // error/final oneshots); deltas were already consumed above, so this
        // just resolves the terminal outcome.
        let mut response = drain_stream(stream).await?;
        if response.output_text.is_empty() {
            response.output_text = accumulated;
        }
        Ok(response)
    }

    async fn append_assistant_text(&self, text: &str) {
        let mut state = self.state.write().await;
        state.messages.push(Message::assistant(text));
    }

    async fn append_tool_round(
        &self,
        assistant_text: &str,
        calls: &[crate::content::ToolCall],
        executions: &[ToolExecution],
    ) {
        let mut state = self.state.write().await;
        state.messages.push(Message::assistant_tool_calls(assistant_text, calls.to_vec()));
        for execution in executions {
            state.messages.push(Message::tool_result(execution.result.clone()));
        }
        state.total_tool_calls += executions.len() as u32;
        state.tool_history.extend_from_slice(executions);
    }

    async fn maintain_memory(&self) {
        let Some(memory_config) = self.config.memory_config.clone() else {
            return;
        };
        let messages = self.state.read().await.messages.clone();
        let builder = self.client.chat(self.model.clone());
        let (rewritten, event) =
            summarize_or_log(CancellationToken::new(), &memory_config, &builder, messages).await;
        if let Some(event) = event {
            let mut state = self.state.write().await;
            state.messages = rewritten;
            drop(state);
            self.config.hooks.fire_summarize(event).await;
        }
    }

    async fn finish(&self, reason: StopReason, error: Option<String>) -> AgentResult {
        let state = self.state.read().await;
        self.config
            .hooks
            .fire_agent_complete(AgentCompleteEvent {
                reason,
                iterations: state.iteration_count,
                total_tool_calls: state.total_tool_calls,
                duration: state.start_time.elapsed(),
            })
            .await;

        let output_text = state
            .messages
            .iter()
            .rev()
            .find(|m| m.role == crate::content::MessageRole::Assistant)
            .map(Message::effective_text)
            .unwrap_or_default();

        AgentResult {
            output_text,
            stop_reason: reason,
            iterations: state.iteration_count,
            total_tool_calls: state.total_tool_calls,
            tool_history: state.tool_history.clone(),
            messages: state.messages.clone(),
            error,
        }
    }
}

enum IterationOutcome {
    Continue,
    Stop(AgentResult),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatResponse;
    use crate::content::ToolCall;
    use crate::provider::Provider;
    use crate::stream::ChatStream;
    use crate::usage::{Feature, ModelInfo};
    use crate::ChatRequest;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<Vec<ChatResponse>>,
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn id(&self) -> &str {
            "scripted"
        }
        fn models(&self) -> Vec<ModelInfo> {
            Vec::new()
        }
        fn supports(&self, _feature: Feature) -> bool {
            true
        }
        async fn chat(&self, _ctx: CancellationToken, request: ChatRequest) -> Result<ChatResponse> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                panic!("ScriptedProvider ran out of scripted responses");
            }
            let mut response = responses.remove(0);
            response.model = request.model;
            Ok(response)
        }
        async fn stream_chat(&self, _ctx: CancellationToken, _request: ChatRequest) -> Result<ChatStream> {
            unimplemented!()
        }
    }

    fn terminal_response(text: &str) -> ChatResponse {
        ChatResponse {
            id: "r".into(),
            model: "m".into(),
            output_text: text.into(),
            usage: Usage::new(10, 10),
            tool_calls: Vec::new(),
            reasoning: None,
            status: None,
        }
    }

    fn tool_call_response(calls: Vec<ToolCall>) -> ChatResponse {
        ChatResponse {
            id: "r".into(),
            model: "m".into(),
            output_text: String::new(),
            usage: Usage::new(10, 10),
            tool_calls: calls,
            reasoning: None,
            status: None,
        }
    }

    struct EchoExecutor;
    #[async_trait]
    impl ToolExecutor for EchoExecutor {
        async fn execute(&self, _ctx: CancellationToken, _name: &str, args: &str) -> Result<Value> {
            Ok(serde_json::from_str(args).unwrap_or(Value::Null))
        }
    }

    #[tokio::test]
    async fn test_single_turn_no_tools_completes() {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![terminal_response("hello there")]),
        });
        let client = Arc::new(Client::new(provider));
        let runner = Runner::new(client, "m", Arc::new(EchoExecutor));
        let result = runner.run(CancellationToken::new(), "hi").await;
        assert_eq!(result.stop_reason, StopReason::Complete);
        assert_eq!(result.output_text, "hello there");
        assert_eq!(result.iterations, 1);
    }

    #[tokio::test]
    async fn test_one_tool_call_then_completion() {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![
                tool_call_response(vec![ToolCall::new("c1", "echo", "{\"x\":1}")]),
                terminal_response("done"),
            ]),
        });
        let client = Arc::new(Client::new(provider));
        let runner = Runner::new(client, "m", Arc::new(EchoExecutor));
        let result = runner.run(CancellationToken::new(), "hi").await;
        assert_eq!(result.stop_reason, StopReason::Complete);
        assert_eq!(result.total_tool_calls, 1);
        assert_eq!(result.iterations, 2);
    }

    #[tokio::test]
    async fn test_max_tool_calls_cap_stops_before_dispatch() {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![tool_call_response(vec![
                ToolCall::new("c1", "echo", "{}"),
                ToolCall::new("c2", "echo", "{}"),
            ])]),
        });
        let client = Arc::new(Client::new(provider));
        let config = AgentConfig::new().with_max_tool_calls(1);
        let runner = Runner::new(client, "m", Arc::new(EchoExecutor)).with_config(config);
        let result = runner.run(CancellationToken::new(), "hi").await;
        assert_eq!(result.stop_reason, StopReason::MaxToolCalls);
        assert_eq!(result.total_tool_calls, 0);
    }

    #[tokio::test]
    async fn test_stop_sequence_halts_loop() {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![terminal_response("the answer is DONE_MARKER")]),
        });
        let client = Arc::new(Client::new(provider));
        let config = AgentConfig::new().with_stop_sequence("DONE_MARKER");
        let runner = Runner::new(client, "m", Arc::new(EchoExecutor)).with_config(config);
        let result = runner.run(CancellationToken::new(), "hi").await;
        assert_eq!(result.stop_reason, StopReason::StopSequence);
    }

    #[tokio::test]
    async fn test_cancellation_before_loop_starts() {
        let provider = Arc::new(ScriptedProvider { responses: Mutex::new(vec![]) });
        let client = Arc::new(Client::new(provider));
        let runner = Runner::new(client, "m", Arc::new(EchoExecutor));
        let ctx = CancellationToken::new();
        ctx.cancel();
        let result = runner.run(ctx, "hi").await;
        assert_eq!(result.stop_reason, StopReason::Canceled);
    }

    #[tokio::test]
    async fn test_max_iterations_stops_loop() {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![
                tool_call_response(vec![ToolCall::new("c1", "echo", "{}")]),
                tool_call_response(vec![ToolCall::new("c2", "echo", "{}")]),
            ]),
        });
        let client = Arc::new(Client::new(provider));
        let config = AgentConfig::new().with_max_iterations(2).with_max_tool_calls(50);
        let runner = Runner::new(client, "m", Arc::new(EchoExecutor)).with_config(config);
        let result = runner.run(CancellationToken::new(), "hi").await;
        assert_eq!(result.stop_reason, StopReason::MaxIterations);
        assert_eq!(result.iterations, 2);
    }

    #[tokio::test]
    async fn test_max_iterations_zero_is_unbounded() {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![
                tool_call_response(vec![ToolCall::new("c1", "echo", "{}")]),
                terminal_response("done"),
            ]),
        });
        let client = Arc::new(Client::new(provider));
        let config = AgentConfig::new().with_max_iterations(0);
        let runner = Runner::new(client, "m", Arc::new(EchoExecutor)).with_config(config);
        let result = runner.run(CancellationToken::new(), "hi").await;
        assert_eq!(result.stop_reason, StopReason::Complete);
        assert_eq!(result.iterations, 2);
    }

    #[tokio::test]
    async fn test_max_tool_calls_zero_is_unbounded() {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![
                tool_call_response(vec![
                    ToolCall::new("c1", "echo", "{}"),
                    ToolCall::new("c2", "echo", "{}"),
                    ToolCall::new("c3", "echo", "{}"),
                ]),
                terminal_response("done"),
            ]),
        });
        let client = Arc::new(Client::new(provider));
        let config = AgentConfig::new().with_max_tool_calls(0);
        let runner = Runner::new(client, "m", Arc::new(EchoExecutor)).with_config(config);
        let result = runner.run(CancellationToken::new(), "hi").await;
        assert_eq!(result.stop_reason, StopReason::Complete);
        assert_eq!(result.total_tool_calls, 3);
    }

    #[tokio::test]
    async fn test_snapshot_resume_preserves_iteration_count() {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![terminal_response("first")]),
        });
        let client = Arc::new(Client::new(provider));
        let runner = Runner::new(client.clone(), "m", Arc::new(EchoExecutor));
        let _ = runner.run(CancellationToken::new(), "hi").await;
        let snapshot = runner.snapshot().await;
        assert_eq!(snapshot.iteration_count, 1);

        let provider2 = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![terminal_response("second")]),
        });
        let client2 = Arc::new(Client::new(provider2));
        let resumed = Runner::new(client2, "m", Arc::new(EchoExecutor));
        resumed.resume(snapshot).await.unwrap();
        let result = resumed.run(CancellationToken::new(), "continue").await;
        assert_eq!(result.iterations, 2);
    }

    #[tokio::test]
    async fn test_resume_rejects_unknown_snapshot_version() {
        let provider = Arc::new(ScriptedProvider { responses: Mutex::new(vec![]) });
        let client = Arc::new(Client::new(provider));
        let runner = Runner::new(client, "m", Arc::new(EchoExecutor));
        let mut snapshot = runner.snapshot().await;
        snapshot.version = "99.0".to_string();
        let err = runner.resume(snapshot).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_hook_abort_counter() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter2 = counter.clone();
        let _hooks = crate::agent::hooks::AgentHooks::new().on_iteration_start(move |_event| {
            counter2.fetch_add(1, Ordering::SeqCst);
            async { None }
        });
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
