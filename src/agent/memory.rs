//! Auto-summarization: keeps conversation memory under a token budget.
//!
//! Cost is estimated as `ceil(chars / 4)` per message, summed across the
//! transcript and compared against a limit. Rather than blunt truncation
//! once that limit is neared, this module uses an LLM-driven summary,
//! preserving the most recent `preserve_last_n` messages verbatim and
//! compacting everything before them into one system message.

use crate::agent::config::MemoryConfig;
use crate::agent::hooks::SummarizeEvent;
use crate::content::Message;
use crate::request::ChatRequestBuilder;
use crate::Result;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const DEFAULT_SUMMARIZATION_PROMPT: &str = "Summarize the conversation so far. Preserve: the \
original goal, key decisions made, tool outcomes, current progress, and any errors encountered. \
Be concise but do not omit anything the assistant will need to continue the task.";

fn estimate_tokens(messages: &[Message]) -> u64 {
    let total_chars: usize = messages.iter().map(Message::estimate_char_cost).sum();
    ((total_chars as f64) / 4.0).ceil() as u64
}

fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        if let Some(calls) = &message.tool_calls {
            for call in calls {
                out.push_str(&format!("[Tool Call: {}({})]\n", call.name, call.arguments));
            }
        }
        if let Some(results) = &message.tool_results {
            for result in results {
                let content = truncate(&result.content_as_text(), 500);
                if result.is_error {
                    out.push_str(&format!("[Tool Error: {content}]\n"));
                } else {
                    out.push_str(&format!("[Tool Result: {content}]\n"));
                }
            }
        }
        let text = message.effective_text();
        if !text.is_empty() {
            out.push_str(&format!("{:?}: {text}\n", message.role));
        }
    }
    out
}

/// Truncates to at most `max` bytes, rounded down to the nearest char
/// boundary so a multibyte character straddling `max` is never split.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let end = s
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|&i| i <= max)
            .last()
            .unwrap_or(0);
        format!("{}...", &s[..end])
    }
}

/// If summarization is needed, returns the rewritten message list and the
/// event payload for the `on_summarize` hook. Returns `Ok(None)` when no
/// rewrite is warranted. Summarization errors are returned to the caller,
/// who is expected (per the runner's failure policy) to log them through
/// the hook channel rather than abort the loop.
pub async fn maybe_summarize(
    ctx: CancellationToken,
    config: &MemoryConfig,
    builder: &ChatRequestBuilder,
    messages: Vec<Message>,
) -> Result<Option<(Vec<Message>, SummarizeEvent)>> {
    if config.max_tokens == 0 {
        return Ok(None);
    }

    let original_tokens = estimate_tokens(&messages);
    if (original_tokens as f64) < (config.max_tokens as f64) * config.threshold {
        return Ok(None);
    }
    if messages.len() < config.preserve_last_n {
        return Ok(None);
    }

    let split_at = messages.len() - config.preserve_last_n;
    let to_summarize = &messages[..split_at];
    let preserved = &messages[split_at..];

    let prompt = config
        .summarization_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SUMMARIZATION_PROMPT.to_string());
    let transcript = render_transcript(to_summarize);

    let summary_request = builder
        .clone()
        .messages(vec![Message::system(prompt), Message::user(transcript)]);
    let response = summary_request.get_response(ctx).await?;
    let summary = response.output_text;

    let mut rewritten = Vec::with_capacity(preserved.len() + 1);
    rewritten.push(Message::system(format!("Previous conversation summary:\n{summary}")));
    rewritten.extend_from_slice(preserved);

    let summarized_tokens = estimate_tokens(&rewritten);
    let event = SummarizeEvent {
        original_tokens,
        summarized_tokens,
        messages_removed: to_summarize.len(),
        summary,
    };

    Ok(Some((rewritten, event)))
}

/// Runs [`maybe_summarize`], logging (but never propagating) failures.
pub async fn summarize_or_log(
    ctx: CancellationToken,
    config: &MemoryConfig,
    builder: &ChatRequestBuilder,
    messages: Vec<Message>,
) -> (Vec<Message>, Option<SummarizeEvent>) {
    match maybe_summarize(ctx, config, builder, messages.clone()).await {
        Ok(Some((rewritten, event))) => (rewritten, Some(event)),
        Ok(None) => (messages, None),
        Err(err) => {
            warn!("summarization failed: {err}");
            (messages, None)
        }
    }
}
