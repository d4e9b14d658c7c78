//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, AnswerStream, AnswerUpdate, ApiStatus, ClientConfig, ClientError, Conversation,
    DraftStatus, HttpTravelBackend, QueryRecord, ResponseDraft, StreamFailure, TravelBackend,
};
