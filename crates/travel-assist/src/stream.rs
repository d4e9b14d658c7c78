//! Typed events carried by the answer stream and the line decoder.

use tracing::{debug, warn};

/// Prefix marking a payload line.
pub const PAYLOAD_MARKER: &str = "data: ";

/// Identity of a streamed answer, sent once before any content.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Metadata {
    pub id: String,
    pub question: String,
    /// ISO-8601 start time.
    pub timestamp: String,
}

/// One decoded event from the answer stream.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// First event of a stream.
    Metadata(Metadata),
    /// Incremental answer text, applied in arrival order.
    Content {
        #[serde(rename = "content")]
        text: String,
    },
    /// Terminal success.
    Done {
        #[serde(rename = "processing_time")]
        processing_time_seconds: f64,
    },
    /// Terminal failure reported by the server.
    Error {
        #[serde(rename = "error")]
        message: String,
    },
}

impl StreamEvent {
    /// Returns true for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Metadata(_) => "metadata",
            Self::Content { .. } => "content",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

const KNOWN_KINDS: [&str; 4] = ["metadata", "content", "done", "error"];

/// Decodes one logical line into an event.
///
/// Lines without the payload marker, blank payloads and unknown event kinds
/// yield `None`. A payload that is not valid JSON, or a known kind with missing
/// fields, is logged and also yields `None`: one bad line never ends the stream.
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(PAYLOAD_MARKER)?;
    if payload.trim().is_empty() {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, payload_len = payload.len(), "dropping malformed stream payload");
            return None;
        }
    };
    let Some(kind) = value.get("type").and_then(|v| v.as_str()) else {
        warn!("dropping stream payload without a type field");
        return None;
    };
    let Some(kind) = KNOWN_KINDS.iter().copied().find(|known| *known == kind) else {
        debug!(kind, "ignoring unknown stream event kind");
        return None;
    };
    match serde_json::from_value::<StreamEvent>(value) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(kind, error = %err, "dropping stream event with invalid fields");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_known_kind() {
        assert_eq!(
            decode_line(
                r#"data: {"type":"metadata","id":"1","question":"Q","timestamp":"2024-01-01T00:00:00"}"#
            ),
            Some(StreamEvent::Metadata(Metadata {
                id: "1".into(),
                question: "Q".into(),
                timestamp: "2024-01-01T00:00:00".into(),
            }))
        );
        assert_eq!(
            decode_line(r#"data: {"type":"content","content":" Par"}"#),
            Some(StreamEvent::Content { text: " Par".into() })
        );
        assert_eq!(
            decode_line(r#"data: {"type":"done","processing_time":1.5}"#),
            Some(StreamEvent::Done {
                processing_time_seconds: 1.5
            })
        );
        assert_eq!(
            decode_line(r#"data: {"type":"error","error":"rate limited"}"#),
            Some(StreamEvent::Error {
                message: "rate limited".into()
            })
        );
    }

    #[test]
    fn integer_processing_time_is_accepted() {
        assert_eq!(
            decode_line(r#"data: {"type":"done","processing_time":2}"#),
            Some(StreamEvent::Done {
                processing_time_seconds: 2.0
            })
        );
    }

    #[test]
    fn non_payload_and_blank_lines_are_ignored() {
        assert_eq!(decode_line(""), None);
        assert_eq!(decode_line(": keep-alive"), None);
        assert_eq!(decode_line("event: message"), None);
        assert_eq!(decode_line("data: "), None);
        assert_eq!(decode_line("data:    "), None);
    }

    #[test]
    fn malformed_and_unknown_payloads_are_ignored() {
        assert_eq!(decode_line("data: {not json"), None);
        assert_eq!(decode_line(r#"data: {"content":"no type"}"#), None);
        assert_eq!(decode_line(r#"data: {"type":"usage","tokens":3}"#), None);
        assert_eq!(decode_line(r#"data: {"type":"content"}"#), None);
        assert_eq!(decode_line(r#"data: {"type":"done","processing_time":"soon"}"#), None);
    }

    #[test]
    fn content_whitespace_is_not_trimmed() {
        assert_eq!(
            decode_line(r#"data: {"type":"content","content":"  \n"}"#),
            Some(StreamEvent::Content { text: "  \n".into() })
        );
    }

    #[test]
    fn terminal_kinds() {
        assert!(StreamEvent::Done {
            processing_time_seconds: 0.0
        }
        .is_terminal());
        assert!(StreamEvent::Error { message: "x".into() }.is_terminal());
        assert!(!StreamEvent::Content { text: "x".into() }.is_terminal());
    }
}
