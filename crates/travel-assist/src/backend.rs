use std::pin::Pin;
use std::time::Duration;

use crate::errors::ClientError;
use crate::record::{QueryHistory, QueryRecord};

/// Longest question the backend accepts, in characters.
pub const MAX_QUESTION_CHARS: usize = 1000;

/// Default page size when loading history.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Raw body chunks of a streamed answer, in arrival order.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ClientError>> + Send + 'static>>;

/// Request/response surface of the travel assistant backend.
///
/// Implementations own transport concerns only. Framing and assembly of
/// streamed answers happen in `AnswerStream`.
#[async_trait::async_trait]
pub trait TravelBackend: Send + Sync {
    /// Asks a question and waits for the complete record.
    async fn ask(&self, question: &str) -> Result<QueryRecord, ClientError>;

    /// Opens a streamed answer and returns its raw body.
    ///
    /// Connection failures and non-success statuses are returned here, before
    /// any body bytes are read.
    async fn open_stream(&self, question: &str) -> Result<ByteStream, ClientError>;

    /// Loads one page of history, newest first.
    async fn history(&self, limit: usize, offset: usize) -> Result<QueryHistory, ClientError>;

    /// Deletes all stored history.
    async fn clear_history(&self) -> Result<(), ClientError>;

    /// Returns true when the backend reports itself healthy. Never fails.
    async fn health(&self) -> bool;

    /// Idle timeout applied between chunks of a streamed answer.
    fn stream_idle_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Trims a question and checks it against the backend's accepted length.
pub fn validate_question(question: &str) -> Result<&str, ClientError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Validation("question must not be empty".into()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_QUESTION_CHARS {
        return Err(ClientError::Validation(format!(
            "question must be at most {MAX_QUESTION_CHARS} characters (got {chars})"
        )));
    }
    Ok(trimmed)
}
