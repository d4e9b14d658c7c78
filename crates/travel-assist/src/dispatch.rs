use crate::stream::{Metadata, StreamEvent};

/// Receiver for decoded stream events.
///
/// Every method defaults to a no-op, so a handler only implements the kinds it
/// cares about. Handlers run synchronously inside `dispatch` and must not feed
/// the framer that produced the event.
pub trait EventHandler {
    fn on_metadata(&mut self, _metadata: Metadata) {}

    fn on_content(&mut self, _text: String) {}

    fn on_done(&mut self, _processing_time_seconds: f64) {}

    fn on_error(&mut self, _message: String) {}
}

/// Routes one event to the matching handler method.
pub fn dispatch<H: EventHandler + ?Sized>(event: StreamEvent, handler: &mut H) {
    match event {
        StreamEvent::Metadata(metadata) => handler.on_metadata(metadata),
        StreamEvent::Content { text } => handler.on_content(text),
        StreamEvent::Done {
            processing_time_seconds,
        } => handler.on_done(processing_time_seconds),
        StreamEvent::Error { message } => handler.on_error(message),
    }
}
