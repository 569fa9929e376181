//! Client: wraps a [`Provider`], applies telemetry and retry.
//!
//! Earlier revisions of this crate owned a `reqwest::Client` directly and
//! hard-coded request assembly against one backend. The backend is now
//! abstracted behind [`Provider`]; retry and telemetry, which used to be
//! scattered across ad hoc `send`/`query` methods, are centralized here in
//! `execute_chat`/`execute_stream_chat`.

use crate::provider::Provider;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::stream::ChatStream;
use crate::telemetry::{RequestEndEvent, RequestStartEvent, Telemetry};
use crate::{ChatRequest, ChatResponse, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Thread-safe, immutable after construction. `chat(model)` starts a
/// [`crate::request::ChatRequestBuilder`].
pub struct Client {
    provider: Arc<dyn Provider>,
    telemetry: Telemetry,
    retry_policy: RetryPolicy,
}

impl Client {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            telemetry: Telemetry::new(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Starts a [`crate::request::ChatRequestBuilder`] for `model` against this client.
    pub fn chat(self: &Arc<Self>, model: impl Into<String>) -> crate::request::ChatRequestBuilder {
        crate::request::ChatRequestBuilder::new(self.clone(), model)
    }

    #[instrument(skip(self, request), fields(provider = %self.provider.id(), model = %request.model))]
    pub(crate) async fn execute_chat(&self, ctx: CancellationToken, request: ChatRequest) -> Result<ChatResponse> {
        let start = Instant::now();
        self.telemetry
            .fire_request_start(RequestStartEvent {
                provider: self.provider.id().to_string(),
                model: request.model.clone(),
                start_time: start,
            })
            .await;

        let result = retry_with_backoff(&self.retry_policy, || {
            let ctx = ctx.clone();
            let request = request.clone();
            async move {
                if ctx.is_cancelled() {
                    return Err(crate::Error::Canceled);
                }
                self.provider.chat(ctx, request).await
            }
        })
        .await;

        self.telemetry
            .fire_request_end(RequestEndEvent {
                provider: self.provider.id().to_string(),
                model: request.model,
                start_time: start,
                end_time: Instant::now(),
                usage: result.as_ref().ok().map(|r| r.usage),
                error: result.as_ref().err().map(ToString::to_string),
            })
            .await;

        result
    }

    /// No retry is applied to streams: once bytes start flowing, a retry
    /// would duplicate partial output.
    #[instrument(skip(self, request), fields(provider = %self.provider.id(), model = %request.model))]
    pub(crate) async fn execute_stream_chat(&self, ctx: CancellationToken, request: ChatRequest) -> Result<ChatStream> {
        let start = Instant::now();
        self.telemetry
            .fire_request_start(RequestStartEvent {
                provider: self.provider.id().to_string(),
                model: request.model.clone(),
                start_time: start,
            })
            .await;

        let result = self.provider.stream_chat(ctx, request.clone()).await;

        let inner_stream = match result {
            Ok(stream) => stream,
            Err(err) => {
                self.telemetry
                    .fire_request_end(RequestEndEvent {
                        provider: self.provider.id().to_string(),
                        model: request.model,
                        start_time: start,
                        end_time: Instant::now(),
                        usage: None,
                        error: Some(err.to_string()),
                    })
                    .await;
                return Err(err);
            }
        };

        // request-end can only fire once whichever of the stream's final
        // response or terminal error arrives, so the stream is relayed
        // through a fresh sink from a background task that observes that
        // outcome; the caller consumes the relayed stream exactly as before.
        let (sink, outer_stream) = ChatStream::channel(crate::stream::DEFAULT_DELTA_BUFFER);
        let telemetry = self.telemetry.clone();
        let provider_id = self.provider.id().to_string();
        let model = request.model;
        tokio::spawn(async move {
            let outcome = inner_stream.forward_into(sink).await;
            let (usage, error) = match outcome {
                Ok(response) => (Some(response.usage), None),
                Err(err) => (None, Some(err.to_string())),
            };
            telemetry
                .fire_request_end(RequestEndEvent {
                    provider: provider_id,
                    model,
                    start_time: start,
                    end_time: Instant::now(),
                    usage,
                    error,
                })
                .await;
        });

        Ok(outer_stream)
    }
}
