//! Streaming client for a conversational research-search service.
//!
//! The service answers a query as a stream of incremental records, each one
//! an answer fragment plus the sources backing it. This crate opens the
//! streaming request, reassembles records across arbitrary network chunking,
//! and exposes them as a normalized event stream with exactly one terminal
//! event per attempt: completed, failed, or timed out after a configurable
//! inactivity window. A small non-streaming surface covers the follow-up
//! fetches issued around a stream (search by id, thread view, history,
//! reaction).
//!
//! # Builder-first usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use searchstream::http::HttpBackend;
//! use searchstream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = SearchClient::builder()
//!     .backend(Arc::new(HttpBackend::from_env()?))
//!     .build()?;
//!
//! let mut stream = client
//!     .session(SessionConfig::named("demo"))
//!     .search("What is known about statin use in sepsis?")
//!     .start_stream()
//!     .await?;
//!
//! while let Some(event) = stream.next_event().await {
//!     match event {
//!         StreamEvent::Update { update, .. } => print!("{}", update.search.result),
//!         StreamEvent::Completed { .. } => println!(),
//!         StreamEvent::TimedOut { .. } => eprintln!("server went quiet"),
//!         StreamEvent::Failed { error, .. } => eprintln!("search failed: {error}"),
//!         StreamEvent::SearchStarted { .. } => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Transport seam contracts implemented by backends.
pub mod backend;
/// Client entry point and builder.
pub mod client;
/// Public error types used by the client API.
pub mod errors;
/// HTTP backend speaking the service's REST + SSE protocol.
pub mod http;
/// Search builder, streaming handle, and cancellation handle.
pub mod ingest;
/// Wire data model and request/option types.
pub mod models;
/// Process-level tracing setup for binaries and examples.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Session configuration and session handle.
pub mod session;
/// Normalized public stream events.
pub mod stream;

pub use backend::{
    BackendEvent, BackendEventStream, BackendResponseMeta, BackendStreamHandle, SearchBackend,
};
pub use client::{SearchClient, SearchClientBuilder};
pub use errors::{BackendError, ClientError, StreamFailure};
pub use ingest::{AbortHandle, SearchBuilder, SearchStream};
pub use models::{
    HistoryRequest, MAX_QUERY_LENGTH, ReactionRequest, Search, SearchOutcome, SearchUpdate,
    Source, StreamOptions, StreamRequest, Thread, ThreadRequest, ThreadView,
};
pub use session::{SearchSession, SessionConfig};
pub use stream::StreamEvent;
