//! Response assembly state machine.
//!
//! ```text
//! Idle --begin--> AwaitingMetadata --metadata--> Streaming --done--> Completed
//!                       |   ^ content                |  ^ content
//!                       +---+------ error / fail ----+--+---------> Failed
//! ```
//!
//! `Completed` and `Failed` are terminal until the next `begin`.

use tracing::{debug, info, warn};

use crate::dispatch::{EventHandler, dispatch};
use crate::errors::{ClientError, StreamFailure};
use crate::record::QueryRecord;
use crate::stream::{Metadata, StreamEvent};

/// Lifecycle state of a draft.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DraftStatus {
    /// No question submitted.
    Idle,
    /// Question submitted, metadata not seen yet.
    AwaitingMetadata,
    /// Metadata seen, answer text arriving.
    Streaming,
    /// Finished with a record.
    Completed,
    /// Finished with a failure.
    Failed,
}

impl DraftStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// True while a question is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, Self::AwaitingMetadata | Self::Streaming)
    }
}

/// Read-only view of the answer being assembled.
///
/// This is the single source of truth for rendering: progress text, status,
/// and the final record or failure all live here.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseDraft {
    metadata: Option<Metadata>,
    text: String,
    status: DraftStatus,
    record: Option<QueryRecord>,
    failure: Option<StreamFailure>,
}

impl ResponseDraft {
    fn idle() -> Self {
        Self {
            metadata: None,
            text: String::new(),
            status: DraftStatus::Idle,
            record: None,
            failure: None,
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Answer text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    /// The finished record, present only once `Completed`.
    pub fn record(&self) -> Option<&QueryRecord> {
        self.record.as_ref()
    }

    /// The terminal failure, present only once `Failed`.
    pub fn failure(&self) -> Option<&StreamFailure> {
        self.failure.as_ref()
    }

    /// Message to show for a failed draft.
    pub fn error_message(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

/// Consumes stream events in arrival order and builds a `ResponseDraft`.
///
/// One assembler serves one question. Callers start a fresh assembler (or call
/// `begin`) for every submission so nothing leaks between requests.
#[derive(Debug)]
pub struct ResponseAssembler {
    draft: ResponseDraft,
    content_events: u64,
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseAssembler {
    /// Creates an idle assembler.
    pub fn new() -> Self {
        Self {
            draft: ResponseDraft::idle(),
            content_events: 0,
        }
    }

    /// Creates an assembler that already has a question in flight.
    pub fn started() -> Self {
        let mut assembler = Self::new();
        assembler.begin();
        assembler
    }

    /// Discards any previous draft and waits for metadata.
    pub fn begin(&mut self) {
        self.draft = ResponseDraft::idle();
        self.draft.status = DraftStatus::AwaitingMetadata;
        self.content_events = 0;
    }

    pub fn draft(&self) -> &ResponseDraft {
        &self.draft
    }

    pub fn status(&self) -> DraftStatus {
        self.draft.status
    }

    /// Applies one event. Returns false when the event was ignored because
    /// the draft is idle or already terminal.
    pub fn apply(&mut self, event: StreamEvent) -> bool {
        if !self.draft.status.is_active() {
            debug!(
                kind = event.kind(),
                status = ?self.draft.status,
                "ignoring stream event outside an active draft"
            );
            return false;
        }
        dispatch(event, self);
        true
    }

    /// Forces a terminal failure on an active draft.
    ///
    /// Used for failures detected outside the event stream: premature end,
    /// transport errors, timeouts and cancellation. No-op once terminal.
    pub fn fail(&mut self, failure: StreamFailure) {
        if !self.draft.status.is_active() {
            return;
        }
        info!(error = %failure, chars = self.draft.text.len(), "answer stream failed");
        self.draft.status = DraftStatus::Failed;
        self.draft.failure = Some(failure);
    }

    /// Marks the end of the byte stream.
    ///
    /// A draft still waiting for `done` or `error` fails with
    /// `StreamFailure::PrematureEnd`.
    pub fn end_of_stream(&mut self) {
        if self.draft.status.is_active() {
            self.fail(StreamFailure::PrematureEnd);
        }
    }

    /// Terminal outcome, if one has been reached.
    pub fn outcome(&self) -> Option<Result<&QueryRecord, &StreamFailure>> {
        match (&self.draft.record, &self.draft.failure) {
            (Some(record), _) => Some(Ok(record)),
            (None, Some(failure)) => Some(Err(failure)),
            (None, None) => None,
        }
    }

    /// Consumes the assembler and returns its terminal result.
    pub fn into_result(self) -> Result<QueryRecord, ClientError> {
        let ResponseDraft {
            status,
            record,
            failure,
            ..
        } = self.draft;
        match (record, failure) {
            (Some(record), _) => Ok(record),
            (None, Some(failure)) => Err(ClientError::StreamFailed(failure)),
            (None, None) => Err(ClientError::protocol_msg(format!(
                "answer stream has no terminal outcome (status={status:?})"
            ))),
        }
    }
}

impl EventHandler for ResponseAssembler {
    fn on_metadata(&mut self, metadata: Metadata) {
        match self.draft.status {
            DraftStatus::AwaitingMetadata => {
                debug!(id = %metadata.id, buffered = self.draft.text.len(), "stream metadata received");
                // Content that raced ahead of metadata stays in the draft.
                self.draft.metadata = Some(metadata);
                self.draft.status = DraftStatus::Streaming;
            }
            status => {
                warn!(id = %metadata.id, ?status, "ignoring repeated stream metadata");
            }
        }
    }

    fn on_content(&mut self, text: String) {
        if self.draft.status == DraftStatus::AwaitingMetadata {
            debug!("buffering content received before metadata");
        }
        self.content_events += 1;
        self.draft.text.push_str(&text);
    }

    fn on_done(&mut self, processing_time_seconds: f64) {
        let Some(metadata) = self.draft.metadata.clone() else {
            warn!(
                chars = self.draft.text.len(),
                "done event received without metadata"
            );
            self.fail(StreamFailure::MissingMetadata);
            return;
        };
        let record = QueryRecord {
            id: metadata.id,
            question: metadata.question,
            answer: self.draft.text.clone(),
            timestamp: metadata.timestamp,
            processing_time: Some(processing_time_seconds),
        };
        info!(
            id = %record.id,
            chars = record.answer.len(),
            content_events = self.content_events,
            processing_time_seconds,
            "answer stream completed"
        );
        self.draft.record = Some(record);
        self.draft.status = DraftStatus::Completed;
    }

    fn on_error(&mut self, message: String) {
        self.fail(StreamFailure::Server { message });
    }
}
