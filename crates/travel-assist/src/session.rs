use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{TravelBackend, validate_question};
use crate::errors::ClientError;
use crate::record::QueryRecord;
use crate::run::{AbortHandle, AnswerStream};

/// Reachability of the backend as last checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiStatus {
    Online,
    Offline,
}

/// Client-side state of one user's conversation with the assistant.
///
/// Holds the visible history (newest first) and at most one in-flight
/// streamed answer. Starting a new question abandons the previous stream.
pub struct Conversation {
    backend: Arc<dyn TravelBackend>,
    history: Vec<QueryRecord>,
    in_flight: Option<AbortHandle>,
}

impl Conversation {
    pub fn new(backend: Arc<dyn TravelBackend>) -> Self {
        Self {
            backend,
            history: Vec::new(),
            in_flight: None,
        }
    }

    /// Records currently shown, newest first.
    pub fn history(&self) -> &[QueryRecord] {
        &self.history
    }

    pub async fn check_health(&self) -> ApiStatus {
        if self.backend.health().await {
            ApiStatus::Online
        } else {
            ApiStatus::Offline
        }
    }

    /// Replaces the visible history with the backend's newest `limit` records.
    ///
    /// Returns the backend's total record count.
    pub async fn load_history(&mut self, limit: usize) -> Result<usize, ClientError> {
        let page = self.backend.history(limit, 0).await?;
        debug!(loaded = page.queries.len(), total = page.total_count, "history loaded");
        self.history = page.queries;
        Ok(page.total_count)
    }

    /// Asks without streaming and records the answer.
    pub async fn ask(&mut self, question: &str) -> Result<QueryRecord, ClientError> {
        self.abandon_in_flight();
        let question = validate_question(question)?;
        let record = self.backend.ask(question).await?;
        self.complete(record.clone());
        Ok(record)
    }

    /// Opens a streamed answer, abandoning any stream still in flight.
    ///
    /// Pass the finished record to `complete` to add it to the history.
    pub async fn start_stream(&mut self, question: &str) -> Result<AnswerStream, ClientError> {
        self.abandon_in_flight();
        let question = validate_question(question)?;
        let source = self.backend.open_stream(question).await?;
        let answer = AnswerStream::new(source).idle_timeout(self.backend.stream_idle_timeout());
        self.in_flight = Some(answer.abort_handle());
        Ok(answer)
    }

    /// Adds a finished record to the front of the history.
    ///
    /// Returns false if a record with the same id is already shown.
    pub fn complete(&mut self, record: QueryRecord) -> bool {
        self.in_flight = None;
        if self.history.iter().any(|existing| existing.id == record.id) {
            return false;
        }
        self.history.insert(0, record);
        true
    }

    /// Clears the history on the backend, then locally.
    pub async fn clear_history(&mut self) -> Result<(), ClientError> {
        self.backend.clear_history().await?;
        self.history.clear();
        info!("history cleared");
        Ok(())
    }

    /// Cancels the in-flight stream, if any.
    pub fn abandon_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            debug!("abandoning in-flight answer stream");
            handle.abort();
        }
    }
}
