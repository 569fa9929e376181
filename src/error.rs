//! Error types for the agent runtime core.
//!
//! Transport and provider adapters construct a [`ProviderError`] carrying a
//! sentinel [`Cause`] plus whatever metadata the backend exposed. Callers
//! classify failures by matching on `Cause`, never by string-matching a
//! message.

use thiserror::Error;

/// Result type alias used across the crate's public API.
pub type Result<T> = std::result::Result<T, Error>;

/// Sentinel classification of a failure, independent of which backend produced it.
///
/// Retry policy (see [`crate::retry`]) and the agent runner's failure semantics
/// both dispatch on this enum rather than on error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// Credential rejected by the backend.
    Unauthorized,
    /// Backend asked us to slow down. Retryable.
    RateLimited,
    /// Caller-side validation, or semantic rejection by the backend. Not retryable.
    BadRequest,
    /// Requested model or resource does not exist.
    NotFound,
    /// Backend 5xx. Retryable.
    Server,
    /// Transport failure (connect, reset, DNS, TLS). Retryable.
    Network,
    /// Response body could not be parsed. Not retryable.
    Decode,
    /// Capability unavailable on this provider.
    NotSupported,
    /// Request builder validation: no model set.
    ModelRequired,
    /// Request builder validation: no messages in the request.
    NoMessages,
    /// Assembled streaming tool-call arguments were not valid JSON.
    InvalidToolArgs,
    /// Propagated from caller cancellation.
    Canceled,
    /// Propagated from a context/iteration/tool deadline.
    DeadlineExceeded,
}

impl Cause {
    /// Whether an error of this cause should be retried by the default retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Cause::Network | Cause::RateLimited | Cause::Server)
    }
}

/// A rich error surfaced by a provider adapter or the request pipeline.
///
/// Carries enough metadata for callers to log and triage without parsing
/// message text: `provider_id` identifies which backend raised it,
/// `http_status`/`request_id`/`provider_error_code` are passed through
/// verbatim when the backend supplied them.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider_id: String,
    pub http_status: Option<u16>,
    pub request_id: Option<String>,
    pub provider_error_code: Option<String>,
    pub message: String,
    pub cause: Cause,
}

impl ProviderError {
    pub fn new(provider_id: impl Into<String>, cause: Cause, message: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            http_status: None,
            request_id: None,
            provider_error_code: None,
            message: message.into(),
            cause,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_provider_error_code(mut self, code: impl Into<String>) -> Self {
        self.provider_error_code = Some(code.into());
        self
    }

    /// Classifies an HTTP status code into a sentinel cause: 401/403 ->
    /// unauthorized, 429 -> rate-limited, 404 -> not-found, 5xx -> server,
    /// other 4xx -> bad-request.
    pub fn cause_for_status(status: u16) -> Cause {
        match status {
            401 | 403 => Cause::Unauthorized,
            429 => Cause::RateLimited,
            404 => Cause::NotFound,
            500..=599 => Cause::Server,
            _ => Cause::BadRequest,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self.http_status {
            Some(429) => true,
            Some(s) if (500..=599).contains(&s) => true,
            _ => self.cause.is_retryable(),
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {:?}: {}", self.provider_id, self.cause, self.message)?;
        if let Some(status) = self.http_status {
            write!(f, " (http {status})")?;
        }
        if let Some(id) = &self.request_id {
            write!(f, " (request_id {id})")?;
        }
        Ok(())
    }
}

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A rich, sentinel-tagged error from a provider adapter or the request pipeline.
    #[error("{0}")]
    Provider(ProviderError),

    /// HTTP transport error (from the bundled OpenAI-compatible adapter).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Tool execution error (filter denial, hook veto, executor failure).
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Invalid input supplied by the caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller cancellation.
    #[error("Operation canceled")]
    Canceled,

    /// A deadline (iteration, tool, or request timeout) elapsed.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Catch-all for errors that don't fit the above.
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    pub fn provider(err: ProviderError) -> Self {
        Error::Provider(err)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        Error::Tool(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    pub fn model_required() -> Self {
        Error::Provider(ProviderError::new("request-builder", Cause::ModelRequired, "model is required"))
    }

    pub fn no_messages() -> Self {
        Error::Provider(ProviderError::new("request-builder", Cause::NoMessages, "at least one message is required"))
    }

    pub fn invalid_tool_args(msg: impl Into<String>) -> Self {
        Error::Provider(ProviderError::new("tool-call-assembler", Cause::InvalidToolArgs, msg))
    }

    /// The sentinel cause for this error, if it carries one.
    pub fn cause(&self) -> Option<Cause> {
        match self {
            Error::Provider(p) => Some(p.cause),
            Error::Canceled => Some(Cause::Canceled),
            Error::DeadlineExceeded => Some(Cause::DeadlineExceeded),
            _ => None,
        }
    }

    /// Whether the default retry policy should retry this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Provider(p) => p.is_retryable(),
            Error::Http(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_retryable() {
        assert!(Cause::Network.is_retryable());
        assert!(Cause::RateLimited.is_retryable());
        assert!(Cause::Server.is_retryable());
        assert!(!Cause::Unauthorized.is_retryable());
        assert!(!Cause::Canceled.is_retryable());
        assert!(!Cause::DeadlineExceeded.is_retryable());
    }

    #[test]
    fn test_cause_for_status() {
        assert_eq!(ProviderError::cause_for_status(401), Cause::Unauthorized);
        assert_eq!(ProviderError::cause_for_status(429), Cause::RateLimited);
        assert_eq!(ProviderError::cause_for_status(404), Cause::NotFound);
        assert_eq!(ProviderError::cause_for_status(503), Cause::Server);
        assert_eq!(ProviderError::cause_for_status(400), Cause::BadRequest);
    }

    #[test]
    fn test_provider_error_is_retryable_by_status() {
        let err = ProviderError::new("p", Cause::BadRequest, "whatever").with_http_status(500);
        assert!(err.is_retryable());
        let err = ProviderError::new("p", Cause::BadRequest, "whatever").with_http_status(400);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_model_required() {
        let err = Error::model_required();
        assert_eq!(err.cause(), Some(Cause::ModelRequired));
    }

    #[test]
    fn test_error_invalid_tool_args() {
        let err = Error::invalid_tool_args("bad json");
        assert_eq!(err.cause(), Some(Cause::InvalidToolArgs));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_canceled_not_retryable() {
        assert!(!Error::Canceled.is_retryable());
        assert!(!Error::DeadlineExceeded.is_retryable());
    }
}
