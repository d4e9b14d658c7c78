use std::time::Duration;

/// Generic message shown when a request fails without a server-provided detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to get response. Please try again.";

/// Terminal failure of one answer stream.
///
/// Every streamed question ends in exactly one `QueryRecord` or exactly one of
/// these.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum StreamFailure {
    /// The server sent an explicit `error` event. The message is kept verbatim.
    #[error("{message}")]
    Server { message: String },
    /// The transport closed before a `done` or `error` event was seen.
    #[error("stream ended unexpectedly")]
    PrematureEnd,
    /// A `done` event arrived but no `metadata` event was ever observed.
    #[error("stream completed without metadata")]
    MissingMetadata,
    /// Reading the body failed after the stream had started.
    #[error("stream read failed: {message}")]
    Transport { message: String },
    /// No chunk arrived within the caller's idle timeout.
    #[error("stream timed out after {after:?} without data")]
    TimedOut { after: Duration },
    /// The stream was abandoned by the caller.
    #[error("stream cancelled")]
    Cancelled,
}

/// Top-level error type for the client API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid user input, rejected before any request is sent.
    #[error("validation error: {0}")]
    Validation(String),
    /// Connection-level failure before any response body was read.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("request failed with status {status}: {}", .detail.as_deref().unwrap_or("<no detail>"))]
    Status { status: u16, detail: Option<String> },
    /// A single-shot response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// A started stream ended in failure.
    #[error(transparent)]
    StreamFailed(StreamFailure),
    /// Internal misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns the text to show to the user for this error.
    ///
    /// Backend-provided details and stream failures are shown as-is; every
    /// other request failure collapses to a generic retry hint.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Self::Validation(message) => message.clone(),
            Self::StreamFailed(failure) => failure.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Returns true when the failure happened before any stream was established.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

impl From<StreamFailure> for ClientError {
    fn from(value: StreamFailure) -> Self {
        ClientError::StreamFailed(value)
    }
}

/// Extracts `detail` from a FastAPI-style error body (`{"detail": "..."}`).
///
/// Validation errors carry a list of objects under `detail`; the first `msg`
/// is used in that case.
pub(crate) fn detail_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(|v| v.as_str()))
            .map(ToOwned::to_owned),
        _ => None,
    }
}
