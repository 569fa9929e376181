//! Tool dispatch: sequential or bounded-concurrency parallel execution of
//! one LLM-requested batch of tool calls.
//!
//! The sequential path runs tool calls one at a time in a loop with
//! pre/post hooks around each. The parallel path dispatches the same batch
//! concurrently, bounded by a `Semaphore`: each task performs the same
//! filter/hook/timeout/execute/hook sequence and deposits its result keyed
//! by original call index, so the assembled order never depends on
//! completion order.

use crate::agent::config::AgentConfig;
use crate::agent::hooks::{ToolCallEndEvent, ToolCallStartEvent};
use crate::agent::state::ToolExecution;
use crate::content::{ToolCall, ToolResult};
use crate::tools::ToolExecutor;
use crate::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// The result of dispatching one batch: executions in call-index order, plus
/// the earliest (by index) tool error, if any.
pub struct DispatchOutcome {
    pub executions: Vec<ToolExecution>,
    pub first_error: Option<String>,
}

async fn run_one(
    ctx: CancellationToken,
    config: &AgentConfig,
    executor: &dyn ToolExecutor,
    iteration: u32,
    call: ToolCall,
) -> ToolExecution {
    let start = Instant::now();

    if let Some(filter) = &config.tool_filter {
        if !filter(&call.name) {
            let result = ToolResult::error(call.id.clone(), format!("tool {} not allowed", call.name));
            return finish(iteration, call, result, start, config).await;
        }
    }

    let start_event = ToolCallStartEvent { iteration, call: call.clone() };
    if let Some(err) = config.hooks.fire_tool_call_start(start_event).await {
        let result = ToolResult::error(call.id.clone(), err.to_string());
        return finish(iteration, call, result, start, config).await;
    }

    let tool_ctx = ctx.child_token();
    let execute = executor.execute(tool_ctx, &call.name, &call.arguments);
    let result = match tokio::time::timeout(config.tool_timeout, execute).await {
        Ok(Ok(value)) => ToolResult::ok(call.id.clone(), value),
        Ok(Err(err)) => ToolResult::error(call.id.clone(), err.to_string()),
        Err(_) => ToolResult::error(call.id.clone(), Error::DeadlineExceeded.to_string()),
    };

    finish(iteration, call, result, start, config).await
}

async fn finish(
    iteration: u32,
    call: ToolCall,
    result: ToolResult,
    start: Instant,
    config: &AgentConfig,
) -> ToolExecution {
    let duration = start.elapsed();
    config
        .hooks
        .fire_tool_call_end(ToolCallEndEvent {
            iteration,
            call: call.clone(),
            result: result.clone(),
            duration,
        })
        .await;
    ToolExecution {
        iteration,
        call,
        result,
        duration,
        timestamp_millis_since_start: 0,
    }
}

/// Runs `calls` per `config.parallel_tools`/`config.max_parallel_tools`,
/// returning executions in original call-index order.
pub async fn dispatch_batch(
    ctx: CancellationToken,
    config: Arc<AgentConfig>,
    executor: Arc<dyn ToolExecutor>,
    iteration: u32,
    calls: Vec<ToolCall>,
) -> DispatchOutcome {
    let executions = if !config.parallel_tools || calls.len() <= 1 {
        let mut executions = Vec::with_capacity(calls.len());
        for call in calls {
            executions.push(run_one(ctx.clone(), &config, executor.as_ref(), iteration, call).await);
        }
        executions
    } else {
        let bound = if config.max_parallel_tools == 0 {
            calls.len()
        } else {
            config.max_parallel_tools.min(calls.len())
        };
        let semaphore = Arc::new(Semaphore::new(bound.max(1)));
        let mut handles = Vec::with_capacity(calls.len());
        for (index, call) in calls.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let ctx = ctx.clone();
            let config = config.clone();
            let executor = executor.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let execution = run_one(ctx, &config, executor.as_ref(), iteration, call).await;
                (index, execution)
            }));
        }
        let mut indexed = Vec::with_capacity(handles.len());
        for handle in handles {
            indexed.push(handle.await.expect("tool dispatch task panicked"));
        }
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, execution)| execution).collect()
    };

    let first_error = executions
        .iter()
        .find(|execution| execution.result.is_error)
        .map(|execution| execution.result.content_as_text());

    DispatchOutcome { executions, first_error }
}
