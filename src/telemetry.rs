//! Telemetry callbacks: request-start/request-end, content-free by contract.
//!
//! Handler registration follows the same shape as the agent hooks: an
//! `Arc<dyn Fn(...) -> Pin<Box<dyn Future<...>>>>` per callback, added
//! fluently. Telemetry differs from agent hooks in that it cannot veto
//! anything, both events are notifications only, and its payloads are
//! restricted to metadata: never message content, tool arguments,
//! responses, or credentials.

use crate::usage::Usage;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct RequestStartEvent {
    pub provider: String,
    pub model: String,
    pub start_time: Instant,
}

#[derive(Debug, Clone)]
pub struct RequestEndEvent {
    pub provider: String,
    pub model: String,
    pub start_time: Instant,
    pub end_time: Instant,
    pub usage: Option<Usage>,
    pub error: Option<String>,
}

impl RequestEndEvent {
    pub fn duration(&self) -> std::time::Duration {
        self.end_time.duration_since(self.start_time)
    }
}

type RequestStartHandler = Arc<dyn Fn(RequestStartEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;
type RequestEndHandler = Arc<dyn Fn(RequestEndEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Telemetry sink. Default is a no-op (no handlers registered).
#[derive(Clone, Default)]
pub struct Telemetry {
    on_request_start: Vec<RequestStartHandler>,
    on_request_end: Vec<RequestEndHandler>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request_start<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(RequestStartEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_request_start.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn on_request_end<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(RequestEndEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_request_end.push(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub(crate) async fn fire_request_start(&self, event: RequestStartEvent) {
        for handler in &self.on_request_start {
            handler(event.clone()).await;
        }
    }

    pub(crate) async fn fire_request_end(&self, event: RequestEndEvent) {
        for handler in &self.on_request_end {
            handler(event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_no_op_telemetry_fires_nothing() {
        let telemetry = Telemetry::new();
        telemetry
            .fire_request_start(RequestStartEvent {
                provider: "p".into(),
                model: "m".into(),
                start_time: Instant::now(),
            })
            .await;
    }

    #[tokio::test]
    async fn test_registered_handlers_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let telemetry = Telemetry::new().on_request_start(move |_event| {
            let count = count2.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });
        telemetry
            .fire_request_start(RequestStartEvent {
                provider: "p".into(),
                model: "m".into(),
                start_time: Instant::now(),
            })
            .await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_end_duration() {
        let start = Instant::now();
        let end = start + std::time::Duration::from_millis(50);
        let event = RequestEndEvent {
            provider: "p".into(),
            model: "m".into(),
            start_time: start,
            end_time: end,
            usage: None,
            error: None,
        };
        assert_eq!(event.duration(), std::time::Duration::from_millis(50));
    }
}
