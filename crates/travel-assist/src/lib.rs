//! Client core for the travel assistant.
//!
//! Answers arrive either as one JSON record or as a stream of `data: {...}`
//! lines. The streaming path runs body chunks through a [`LineFramer`], decodes
//! each line into a [`StreamEvent`], and feeds the events to a
//! [`ResponseAssembler`] whose [`ResponseDraft`] is what the UI renders. Both
//! paths end in the same [`QueryRecord`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use travel_assist::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let backend = Arc::new(HttpTravelBackend::from_env()?);
//! let mut conversation = Conversation::new(backend);
//!
//! let mut answer = conversation.start_stream("Do I need a visa for Japan?").await?;
//! while let Some(update) = answer.next_update().await {
//!     if let AnswerUpdate::Delta { text, .. } = update {
//!         print!("{text}");
//!     }
//! }
//! let record = answer.finish().await?;
//! conversation.complete(record);
//! # Ok(())
//! # }
//! ```

/// Response assembly state machine and draft snapshot.
pub mod assembler;
/// Backend trait seam and question validation.
pub mod backend;
/// Client configuration.
pub mod config;
/// Event routing to typed handlers.
pub mod dispatch;
/// Public error types.
pub mod errors;
/// Line framing of chunked bodies.
pub mod framer;
/// HTTP implementation of the backend.
pub mod http;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Finished records and history pages.
pub mod record;
/// Streamed answer driver and cancellation handle.
pub mod run;
/// Conversation state shared with the UI.
pub mod session;
/// Stream events and the line decoder.
pub mod stream;

pub use assembler::{DraftStatus, ResponseAssembler, ResponseDraft};
pub use backend::{ByteStream, TravelBackend};
pub use config::ClientConfig;
pub use dispatch::{EventHandler, dispatch};
pub use errors::{ClientError, StreamFailure};
pub use framer::LineFramer;
pub use http::HttpTravelBackend;
pub use observability::init_observability;
pub use record::{QueryHistory, QueryRecord};
pub use run::{AbortHandle, AnswerStream, AnswerUpdate};
pub use session::{ApiStatus, Conversation};
pub use stream::{Metadata, StreamEvent, decode_line};
