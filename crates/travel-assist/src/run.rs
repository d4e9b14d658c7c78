use std::collections::VecDeque;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::watch;
use tracing::debug;

use crate::assembler::{DraftStatus, ResponseAssembler, ResponseDraft};
use crate::backend::ByteStream;
use crate::errors::{ClientError, StreamFailure};
use crate::framer::LineFramer;
use crate::record::QueryRecord;
use crate::stream::{Metadata, StreamEvent, decode_line};

/// Handle used to abandon an answer stream.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The stream observes it at its next read and ends with
    /// `StreamFailure::Cancelled`. A stream that already finished is unaffected.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// A change to the draft worth rendering.
#[derive(Clone, Debug, PartialEq)]
pub enum AnswerUpdate {
    /// Metadata arrived; the answer now has an id.
    Started { metadata: Metadata },
    /// More answer text, in order.
    Delta { seq: u64, text: String },
    /// Terminal success.
    Completed { record: QueryRecord },
    /// Terminal failure.
    Failed { failure: StreamFailure },
}

enum Read {
    Chunk(bytes::Bytes),
    End,
    Failed(String),
    TimedOut(Duration),
    Aborted,
}

/// One streamed answer: byte source, framer and assembler for a single question.
///
/// Reading the next chunk is the only suspension point; each chunk is framed,
/// decoded and applied before the next read. The byte source is dropped as soon
/// as the answer reaches a terminal state, and on drop of the stream itself.
pub struct AnswerStream {
    source: Option<ByteStream>,
    framer: LineFramer,
    assembler: ResponseAssembler,
    pending: VecDeque<StreamEvent>,
    idle_timeout: Option<Duration>,
    abort_tx: watch::Sender<bool>,
    abort_rx: watch::Receiver<bool>,
    seq: u64,
}

impl AnswerStream {
    /// Starts assembling an answer from a raw body stream.
    pub fn new(source: ByteStream) -> Self {
        let (abort_tx, abort_rx) = watch::channel(false);
        Self {
            source: Some(source),
            framer: LineFramer::new(),
            assembler: ResponseAssembler::started(),
            pending: VecDeque::new(),
            idle_timeout: None,
            abort_tx,
            abort_rx,
            seq: 0,
        }
    }

    /// Fails the answer if no chunk arrives within `timeout`.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Returns a handle that can cancel this stream from elsewhere.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    /// Current state of the answer.
    pub fn draft(&self) -> &ResponseDraft {
        self.assembler.draft()
    }

    pub fn status(&self) -> DraftStatus {
        self.assembler.status()
    }

    /// Waits for the next change to the draft.
    ///
    /// Returns `None` once a terminal update has been returned.
    pub async fn next_update(&mut self) -> Option<AnswerUpdate> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if let Some(update) = self.apply(event) {
                    return Some(update);
                }
                continue;
            }
            if !self.assembler.status().is_active() {
                self.release();
                return None;
            }
            let Some(source) = self.source.as_mut() else {
                self.assembler.end_of_stream();
                return self.terminal_update();
            };

            let read = tokio::select! {
                biased;
                _ = aborted(&mut self.abort_rx) => Read::Aborted,
                read = read_chunk(source, self.idle_timeout) => read,
            };
            match read {
                Read::Chunk(chunk) => {
                    debug!(len = chunk.len(), "answer chunk received");
                    for line in self.framer.feed(&chunk) {
                        self.pending.extend(decode_line(&line));
                    }
                }
                Read::End => {
                    debug!(pending = self.framer.pending_len(), "answer body ended");
                    self.release();
                    if let Some(tail) = self.framer.finish() {
                        self.pending.extend(decode_line(&tail));
                    }
                }
                Read::Failed(message) => {
                    self.assembler.fail(StreamFailure::Transport { message });
                    self.release();
                    return self.terminal_update();
                }
                Read::TimedOut(after) => {
                    self.assembler.fail(StreamFailure::TimedOut { after });
                    self.release();
                    return self.terminal_update();
                }
                Read::Aborted => {
                    self.assembler.fail(StreamFailure::Cancelled);
                    self.release();
                    return self.terminal_update();
                }
            }
        }
    }

    /// Drives the stream to its end and returns the finished record.
    ///
    /// Safe to call after consuming some updates with `next_update()`.
    pub async fn finish(mut self) -> Result<QueryRecord, ClientError> {
        while self.next_update().await.is_some() {}
        self.assembler.into_result()
    }

    fn apply(&mut self, event: StreamEvent) -> Option<AnswerUpdate> {
        let was_streaming = self.assembler.status() == DraftStatus::Streaming;
        let delta = match &event {
            StreamEvent::Content { text } if !text.is_empty() => Some(text.clone()),
            _ => None,
        };
        if !self.assembler.apply(event) {
            return None;
        }
        match self.assembler.status() {
            DraftStatus::Completed | DraftStatus::Failed => {
                self.release();
                self.terminal_update()
            }
            DraftStatus::Streaming if !was_streaming => {
                self.assembler
                    .draft()
                    .metadata()
                    .cloned()
                    .map(|metadata| AnswerUpdate::Started { metadata })
            }
            _ => delta.map(|text| {
                let seq = self.seq;
                self.seq = self.seq.saturating_add(1);
                AnswerUpdate::Delta { seq, text }
            }),
        }
    }

    fn terminal_update(&self) -> Option<AnswerUpdate> {
        let draft = self.assembler.draft();
        if let Some(record) = draft.record() {
            return Some(AnswerUpdate::Completed {
                record: record.clone(),
            });
        }
        draft.failure().cloned().map(|failure| AnswerUpdate::Failed { failure })
    }

    fn release(&mut self) {
        if self.source.take().is_some() {
            debug!(status = ?self.assembler.status(), "answer body released");
        }
        self.pending.clear();
    }
}

async fn aborted(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn read_chunk(source: &mut ByteStream, idle_timeout: Option<Duration>) -> Read {
    let next = match idle_timeout {
        Some(after) => match tokio::time::timeout(after, source.next()).await {
            Ok(next) => next,
            Err(_) => return Read::TimedOut(after),
        },
        None => source.next().await,
    };
    match next {
        Some(Ok(chunk)) => Read::Chunk(chunk),
        Some(Err(ClientError::Transport(message))) => Read::Failed(message),
        Some(Err(err)) => Read::Failed(err.to_string()),
        None => Read::End,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn source(chunks: &[&str]) -> ByteStream {
        let items: Vec<Result<bytes::Bytes, ClientError>> = chunks
            .iter()
            .map(|chunk| Ok(bytes::Bytes::copy_from_slice(chunk.as_bytes())))
            .collect();
        Box::pin(stream::iter(items))
    }

    const METADATA: &str =
        "data: {\"type\":\"metadata\",\"id\":\"1\",\"question\":\"Q\",\"timestamp\":\"T\"}\n";

    #[tokio::test]
    async fn grouped_chunks_build_record() {
        let mut answer = AnswerStream::new(source(&[
            METADATA,
            "data: {\"type\":\"content\",\"content\":\"Par\"}\n",
            "data: {\"type\":\"content\",\"content\":\"is\"}\n",
            "data: {\"type\":\"done\",\"processing_time\":1.5}\n",
        ]));

        let mut updates = Vec::new();
        while let Some(update) = answer.next_update().await {
            updates.push(update);
        }
        assert_eq!(updates.len(), 4);
        assert!(matches!(&updates[0], AnswerUpdate::Started { metadata } if metadata.id == "1"));
        assert_eq!(
            updates[1],
            AnswerUpdate::Delta {
                seq: 0,
                text: "Par".into()
            }
        );
        assert_eq!(
            updates[2],
            AnswerUpdate::Delta {
                seq: 1,
                text: "is".into()
            }
        );
        assert_eq!(
            updates[3],
            AnswerUpdate::Completed {
                record: QueryRecord {
                    id: "1".into(),
                    question: "Q".into(),
                    answer: "Paris".into(),
                    timestamp: "T".into(),
                    processing_time: Some(1.5),
                }
            }
        );
        assert_eq!(answer.status(), DraftStatus::Completed);
    }

    #[tokio::test]
    async fn draft_is_readable_after_each_delta() {
        let mut answer = AnswerStream::new(source(&[
            METADATA,
            "data: {\"type\":\"content\",\"content\":\"a\"}\ndata: {\"type\":\"content\",\"content\":\"b\"}\n",
        ]));
        let mut seen = Vec::new();
        while let Some(update) = answer.next_update().await {
            if let AnswerUpdate::Delta { .. } = update {
                seen.push(answer.draft().text().to_string());
            }
        }
        assert_eq!(seen, vec!["a", "ab"]);
    }

    #[tokio::test]
    async fn line_split_mid_payload_decodes_once() {
        let record = AnswerStream::new(source(&[
            METADATA,
            "data: {\"type\":\"con",
            "tent\",\"content\":\"X\"}\n",
            "data: {\"type\":\"done\",\"processing_time\":0.1}\n",
        ]))
        .finish()
        .await
        .expect("record");
        assert_eq!(record.answer, "X");
    }

    #[tokio::test]
    async fn server_error_event_fails_stream() {
        let mut answer = AnswerStream::new(source(&[
            "data: {\"type\":\"error\",\"error\":\"rate limited\"}\n",
        ]));
        let update = answer.next_update().await;
        assert_eq!(
            update,
            Some(AnswerUpdate::Failed {
                failure: StreamFailure::Server {
                    message: "rate limited".into()
                }
            })
        );
        assert_eq!(answer.next_update().await, None);
        assert!(answer.draft().record().is_none());
        assert_eq!(
            answer.draft().error_message().as_deref(),
            Some("rate limited")
        );
    }

    #[tokio::test]
    async fn close_without_done_is_premature_end() {
        let err = AnswerStream::new(source(&[
            METADATA,
            "data: {\"type\":\"content\",\"content\":\"partial\"}\n",
        ]))
        .finish()
        .await
        .expect_err("premature end");
        assert_eq!(err, ClientError::StreamFailed(StreamFailure::PrematureEnd));
    }

    #[tokio::test]
    async fn unterminated_final_line_is_flushed() {
        let record = AnswerStream::new(source(&[
            METADATA,
            "data: {\"type\":\"content\",\"content\":\"ok\"}\n",
            "data: {\"type\":\"done\",\"processing_time\":2.0}",
        ]))
        .finish()
        .await
        .expect("record");
        assert_eq!(record.answer, "ok");
    }

    #[tokio::test]
    async fn malformed_line_does_not_abort_processing() {
        let mut answer = AnswerStream::new(source(&[
            "data: {not json\n",
            "data: {\"type\":\"content\",\"content\":\"hi\"}\n",
        ]));
        while answer.next_update().await.is_some() {}
        assert_eq!(answer.draft().text(), "hi");
        assert_eq!(
            answer.draft().failure(),
            Some(&StreamFailure::PrematureEnd)
        );
    }

    #[tokio::test]
    async fn events_after_terminal_are_not_applied() {
        let mut answer = AnswerStream::new(source(&[
            METADATA,
            "data: {\"type\":\"content\",\"content\":\"done\"}\ndata: {\"type\":\"done\",\"processing_time\":1.0}\ndata: {\"type\":\"content\",\"content\":\" extra\"}\n",
            "data: {\"type\":\"error\",\"error\":\"late\"}\n",
        ]));
        while answer.next_update().await.is_some() {}
        assert_eq!(answer.status(), DraftStatus::Completed);
        assert_eq!(answer.draft().text(), "done");
        assert!(answer.draft().failure().is_none());
    }

    #[tokio::test]
    async fn transport_error_mid_stream_fails() {
        let items: Vec<Result<bytes::Bytes, ClientError>> = vec![
            Ok(bytes::Bytes::from_static(METADATA.as_bytes())),
            Err(ClientError::Transport("connection reset".into())),
        ];
        let err = AnswerStream::new(Box::pin(stream::iter(items)))
            .finish()
            .await
            .expect_err("transport failure");
        assert_eq!(
            err,
            ClientError::StreamFailed(StreamFailure::Transport {
                message: "connection reset".into()
            })
        );
    }

    #[tokio::test]
    async fn abort_cancels_pending_read() {
        let pending: ByteStream = Box::pin(stream::pending());
        let mut answer = AnswerStream::new(pending);
        let abort = answer.abort_handle();
        abort.abort();
        assert!(abort.is_aborted());
        assert_eq!(
            answer.next_update().await,
            Some(AnswerUpdate::Failed {
                failure: StreamFailure::Cancelled
            })
        );
        assert_eq!(answer.next_update().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_forces_failure() {
        let pending: ByteStream = Box::pin(stream::pending());
        let err = AnswerStream::new(pending)
            .idle_timeout(Some(Duration::from_secs(5)))
            .finish()
            .await
            .expect_err("timeout");
        assert_eq!(
            err,
            ClientError::StreamFailed(StreamFailure::TimedOut {
                after: Duration::from_secs(5)
            })
        );
    }
}
