//! The provider-agnostic streaming contract.
//!
//! Rather than a single `Stream<Result<OpenAIChunk>>`, a provider must close
//! three independent outputs exactly once: an ordered delta sequence, an
//! at-most-once terminal error, and an at-most-once final aggregate, with
//! the final aggregate authoritative for usage and tool calls. [`ChatStream`]
//! models this as one bounded channel of deltas plus two oneshot channels,
//! matching the ordering `delta* (final | error)`.

use crate::assembler::StreamDelta;
use crate::chat::ChatResponse;
use crate::error::ProviderError;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Suggested bounded capacity for the delta channel (backpressure knob).
pub const DEFAULT_DELTA_BUFFER: usize = 100;

/// The producer-side handle a [`crate::provider::Provider`] uses to drive a [`ChatStream`].
pub struct ChatStreamSink {
    deltas: mpsc::Sender<StreamDelta>,
    error: Option<oneshot::Sender<ProviderError>>,
    final_response: Option<oneshot::Sender<ChatResponse>>,
}

impl ChatStreamSink {
    /// Sends a delta, honoring the consumer's pace (blocks rather than drops
    /// on a full channel).
    pub async fn send_delta(&self, delta: StreamDelta) -> bool {
        self.deltas.send(delta).await.is_ok()
    }

    /// Closes the stream with a terminal error. May be called at most once.
    pub fn finish_error(mut self, error: ProviderError) {
        if let Some(tx) = self.error.take() {
            let _ = tx.send(error);
        }
    }

    /// Closes the stream with the final aggregate. May be called at most once.
    pub fn finish_ok(mut self, response: ChatResponse) {
        if let Some(tx) = self.final_response.take() {
            let _ = tx.send(response);
        }
    }
}

/// Three lazy, single-consumer outputs over one streaming chat request.
pub struct ChatStream {
    deltas: ReceiverStream<StreamDelta>,
    error: oneshot::Receiver<ProviderError>,
    final_response: oneshot::Receiver<ChatResponse>,
}

impl ChatStream {
    /// Creates a connected sink/stream pair with the given delta buffer capacity.
    pub fn channel(buffer: usize) -> (ChatStreamSink, ChatStream) {
        let (delta_tx, delta_rx) = mpsc::channel(buffer);
        let (error_tx, error_rx) = oneshot::channel();
        let (final_tx, final_rx) = oneshot::channel();
        (
            ChatStreamSink {
                deltas: delta_tx,
                error: Some(error_tx),
                final_response: Some(final_tx),
            },
            ChatStream {
                deltas: ReceiverStream::new(delta_rx),
                error: error_rx,
                final_response: final_rx,
            },
        )
    }

    /// Pulls the next delta, if any remain before the stream closes.
    pub async fn next_delta(&mut self) -> Option<StreamDelta> {
        self.deltas.next().await
    }

    /// Relays every delta and the terminal outcome into `sink`, returning
    /// that outcome so a wrapper can observe completion without itself
    /// being the stream's consumer (used to fire request-end telemetry
    /// exactly once around a stream a caller is otherwise consuming fresh).
    pub async fn forward_into(mut self, sink: ChatStreamSink) -> std::result::Result<ChatResponse, ProviderError> {
        while let Some(delta) = self.deltas.next().await {
            if !sink.send_delta(delta).await {
                break;
            }
        }

        tokio::select! {
            biased;
            Ok(err) = &mut self.error => {
                sink.finish_error(err.clone());
                Err(err)
            }
            Ok(response) = &mut self.final_response => {
                sink.finish_ok(response.clone());
                Ok(response)
            }
            else => {
                let err = ProviderError::new(
                    "stream",
                    crate::error::Cause::Decode,
                    "stream closed without a final response or error",
                );
                sink.finish_error(err.clone());
                Err(err)
            }
        }
    }
}

/// Reads deltas to exhaustion, concatenating text; then waits for whichever
/// of `final` or `error` closes first. If the final aggregate's output text
/// is empty, the concatenated deltas are substituted. Tool calls and usage
/// always come from the final aggregate verbatim.
pub async fn drain_stream(mut stream: ChatStream) -> crate::Result<ChatResponse> {
    let mut accumulated = String::new();
    while let Some(delta) = stream.next_delta().await {
        if let Some(text) = &delta.text {
            accumulated.push_str(text);
        }
    }

    tokio::select! {
        biased;
        Ok(err) = &mut stream.error => Err(crate::Error::Provider(err)),
        Ok(mut response) = &mut stream.final_response => {
            if response.output_text.is_empty() {
                response.output_text = accumulated;
            }
            Ok(response)
        }
        else => Err(crate::Error::other("stream closed without a final response or error")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::Usage;

    #[tokio::test]
    async fn test_drain_stream_substitutes_accumulated_text_when_final_empty() {
        let (sink, stream) = ChatStream::channel(DEFAULT_DELTA_BUFFER);
        tokio::spawn(async move {
            sink.send_delta(StreamDelta { text: Some("Hello".into()), ..Default::default() }).await;
            sink.send_delta(StreamDelta { text: Some(" world".into()), finished: true, ..Default::default() }).await;
            sink.finish_ok(ChatResponse {
                id: "r1".into(),
                model: "m".into(),
                output_text: String::new(),
                usage: Usage::default(),
                tool_calls: Vec::new(),
                reasoning: None,
                status: None,
            });
        });
        let response = drain_stream(stream).await.unwrap();
        assert_eq!(response.output_text, "Hello world");
    }

    #[tokio::test]
    async fn test_drain_stream_prefers_final_output_text() {
        let (sink, stream) = ChatStream::channel(DEFAULT_DELTA_BUFFER);
        tokio::spawn(async move {
            sink.send_delta(StreamDelta { text: Some("partial".into()), finished: true, ..Default::default() }).await;
            sink.finish_ok(ChatResponse {
                id: "r1".into(),
                model: "m".into(),
                output_text: "authoritative".into(),
                usage: Usage::default(),
                tool_calls: Vec::new(),
                reasoning: None,
                status: None,
            });
        });
        let response = drain_stream(stream).await.unwrap();
        assert_eq!(response.output_text, "authoritative");
    }

    #[tokio::test]
    async fn test_drain_stream_propagates_terminal_error() {
        use crate::error::Cause;
        let (sink, stream) = ChatStream::channel(DEFAULT_DELTA_BUFFER);
        tokio::spawn(async move {
            sink.send_delta(StreamDelta { text: Some("oops".into()), ..Default::default() }).await;
            sink.finish_error(ProviderError::new("p", Cause::Server, "boom").with_http_status(500));
        });
        let result = drain_stream(stream).await;
        assert!(result.is_err());
    }
}
