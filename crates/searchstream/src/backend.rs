use std::pin::Pin;

use uuid::Uuid;

use crate::errors::BackendError;
use crate::models::{
    HistoryRequest, ReactionRequest, Search, SearchUpdate, StreamRequest, ThreadRequest,
    ThreadView,
};

/// Boxed stream of raw backend events.
pub type BackendEventStream =
    Pin<Box<dyn futures::Stream<Item = Result<BackendEvent, BackendError>> + Send + 'static>>;

/// One item read from an open search stream.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendEvent {
    /// A well-formed search record.
    Update(SearchUpdate),
    /// A record that can never decode. The stream continues; the ingest loop
    /// logs and skips it.
    Malformed { message: String },
    /// Bytes arrived without completing a record. Resets the consumer's
    /// inactivity clock; nothing is delivered to the caller.
    Progress,
}

/// Handle returned by `SearchBackend::open_stream`.
pub struct BackendStreamHandle {
    pub stream: BackendEventStream,
    pub meta: BackendResponseMeta,
}

/// Response metadata captured when the stream was opened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendResponseMeta {
    /// Server-assigned request id, when the service reports one.
    pub request_id: Option<String>,
}

/// Transport seam between the client and the search service.
///
/// The streaming ingestor consumes `open_stream`; the remaining methods are
/// the non-streaming follow-up surface (fetch a finished search, browse a
/// thread, page history, react to an answer).
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    /// Opens the streaming search request for an already-validated query.
    async fn open_stream(&self, req: StreamRequest) -> Result<BackendStreamHandle, BackendError>;

    /// Fetches one finished search with its sources.
    async fn search_by_id(&self, search_id: Uuid) -> Result<SearchUpdate, BackendError>;

    /// Fetches a thread together with its searches.
    async fn thread_by_id(&self, req: ThreadRequest) -> Result<ThreadView, BackendError>;

    /// Pages through the caller's past searches, newest first.
    async fn search_history(&self, req: HistoryRequest) -> Result<Vec<Search>, BackendError>;

    /// Records a thumbs-up/down reaction and returns the updated search.
    async fn send_reaction(&self, req: ReactionRequest) -> Result<Search, BackendError>;
}
