use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{BackendEvent, SearchBackend};
use crate::client::ClientInner;
use crate::errors::{ClientError, StreamFailure, stream_failure_from_backend_error};
use crate::models::{MAX_QUERY_LENGTH, SearchOutcome, StreamOptions, StreamRequest};
use crate::stream::StreamEvent;

/// Handle used to request cancellation of an in-flight stream.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is best-effort and becomes visible as a terminal
    /// `StreamEvent::Failed` with `StreamFailure::Cancelled`.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Shared slot holding the abort handle of a session's in-flight stream.
pub(crate) type StreamSlot = Arc<Mutex<Option<AbortHandle>>>;

/// Builder for configuring and starting one streaming search.
///
/// This is the main user-facing API for providing the query, an optional
/// thread to continue, and runtime options before either streaming events or
/// collecting the final outcome.
pub struct SearchBuilder {
    client: Arc<ClientInner>,
    session_id: Uuid,
    _session_name: String,
    slot: StreamSlot,
    query: String,
    thread_id: Option<Uuid>,
    options: StreamOptions,
}

impl SearchBuilder {
    pub(crate) fn new(
        client: Arc<ClientInner>,
        session_id: Uuid,
        session_name: String,
        slot: StreamSlot,
        query: String,
        options: StreamOptions,
    ) -> Self {
        Self {
            client,
            session_id,
            _session_name: session_name,
            slot,
            query,
            thread_id: None,
            options,
        }
    }

    /// Continues an existing conversation thread.
    pub fn thread(mut self, thread_id: Uuid) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Overrides the inactivity window for this stream.
    pub fn inactivity_timeout(mut self, window: Duration) -> Self {
        self.options.inactivity_timeout = window;
        self
    }

    /// Sets the bounded event buffer size used between the ingest task and
    /// the consumer.
    pub fn event_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.event_buffer_capacity = capacity;
        self
    }

    /// Caps the whole streaming request lifetime.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = Some(timeout);
        self
    }

    /// Validates the builder state and starts a streaming search.
    ///
    /// Fails fast without any network activity when the trimmed query is
    /// empty or too long. Starting a new stream supersedes the session's
    /// previous in-flight stream: its cancellation is issued before the new
    /// transport is opened, so two generations never interleave.
    pub async fn start_stream(self) -> Result<SearchStream, ClientError> {
        let request = self.validate_and_build_request()?;
        let backend = self.client.backend();

        let (tx, rx) = mpsc::channel(request.options.event_buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);
        let abort_handle = AbortHandle { tx: abort_tx };

        {
            let mut current = self.slot.lock().expect("stream slot poisoned");
            if let Some(previous) = current.take() {
                previous.abort();
            }
            *current = Some(abort_handle.clone());
        }

        let stream_id = request.stream_id;
        let session_id = request.session_id;
        tokio::spawn(ingest_task(backend, request, tx, final_tx, abort_rx));

        Ok(SearchStream {
            stream_id,
            session_id,
            rx,
            final_rx,
            abort_handle,
            saw_terminal: false,
        })
    }

    /// Streams to completion and returns the final accumulated outcome.
    pub async fn collect_outcome(self) -> Result<SearchOutcome, ClientError> {
        let stream = self.start_stream().await?;
        stream.finish().await
    }

    /// Streams to completion and returns the concatenated answer text.
    pub async fn collect_text(self) -> Result<String, ClientError> {
        Ok(self.collect_outcome().await?.result_text())
    }

    fn validate_and_build_request(&self) -> Result<StreamRequest, ClientError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(ClientError::Validation(
                "search query must not be empty".into(),
            ));
        }
        if query.chars().count() > MAX_QUERY_LENGTH {
            return Err(ClientError::Validation(format!(
                "search query must be at most {MAX_QUERY_LENGTH} characters"
            )));
        }
        if self.options.event_buffer_capacity == 0 {
            return Err(ClientError::Validation(
                "event_buffer_capacity must be greater than 0".into(),
            ));
        }

        Ok(StreamRequest {
            stream_id: Uuid::new_v4(),
            session_id: self.session_id,
            query: query.to_string(),
            thread_id: self.thread_id,
            options: self.options.clone(),
        })
    }
}

/// Streaming handle returned by `SearchBuilder::start_stream`.
///
/// Use `next_event()` to consume events as they arrive and `finish()` to
/// obtain the final outcome after the terminal event.
pub struct SearchStream {
    stream_id: Uuid,
    session_id: Uuid,
    rx: mpsc::Receiver<StreamEvent>,
    final_rx: oneshot::Receiver<Result<SearchOutcome, ClientError>>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl SearchStream {
    /// Returns the id of this stream generation.
    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    /// Returns the session id that owns this stream.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Returns a handle that can cancel the stream.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for and returns the next normalized stream event.
    ///
    /// Returns `None` after the stream channel is closed.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        let event = self.rx.recv().await;
        if let Some(event) = &event
            && event.is_terminal()
        {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains the stream (if needed) and returns the terminal result.
    ///
    /// This is safe to call after consuming events manually with
    /// `next_event()`. A timeout surfaces as `ClientError::TimedOut`, a
    /// failure as `ClientError::SearchFailed`.
    pub async fn finish(mut self) -> Result<SearchOutcome, ClientError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(event) if event.is_terminal() => self.saw_terminal = true,
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(ClientError::protocol_msg(format!(
                "ingest task ended without a final result (stream={})",
                self.stream_id
            ))),
        }
    }
}

async fn ingest_task(
    backend: Arc<dyn SearchBackend>,
    request: StreamRequest,
    tx: mpsc::Sender<StreamEvent>,
    final_tx: oneshot::Sender<Result<SearchOutcome, ClientError>>,
    mut abort_rx: watch::Receiver<bool>,
) {
    let stream_id = request.stream_id;
    let window = request.options.inactivity_timeout;

    if !send_event(
        &tx,
        StreamEvent::SearchStarted {
            stream_id,
            query: request.query.clone(),
            thread_id: request.thread_id,
        },
    )
    .await
    {
        let _ = final_tx.send(Err(ClientError::protocol_msg(
            "stream receiver dropped before SearchStarted",
        )));
        return;
    }

    // Superseded before the transport was even opened.
    if *abort_rx.borrow() {
        let failure = StreamFailure::Cancelled;
        let _ = send_event(
            &tx,
            StreamEvent::Failed {
                stream_id,
                error: failure.clone(),
                partial: SearchOutcome::default(),
            },
        )
        .await;
        let _ = final_tx.send(Err(ClientError::search_failed(failure)));
        return;
    }

    let mut handle = match backend.open_stream(request).await {
        Ok(handle) => handle,
        Err(err) => {
            let failure = stream_failure_from_backend_error(&err);
            let _ = send_event(
                &tx,
                StreamEvent::Failed {
                    stream_id,
                    error: failure.clone(),
                    partial: SearchOutcome::default(),
                },
            )
            .await;
            let _ = final_tx.send(Err(ClientError::search_failed(failure)));
            return;
        }
    };

    let idle = tokio::time::sleep(window);
    tokio::pin!(idle);

    let mut seq = 0_u64;
    let mut outcome = SearchOutcome::default();
    let mut abort_closed = false;
    loop {
        // Biased polling: a signaled abort always wins over ready stream
        // items, so a superseded generation never delivers after
        // cancellation. The stream arm precedes the deadline so a steadily
        // delivering transport cannot be timed out.
        tokio::select! {
            biased;
            changed = abort_rx.changed(), if !abort_closed => {
                match changed {
                    Ok(()) if *abort_rx.borrow() => {
                        let failure = StreamFailure::Cancelled;
                        let _ = send_event(&tx, StreamEvent::Failed { stream_id, error: failure.clone(), partial: outcome }).await;
                        let _ = final_tx.send(Err(ClientError::search_failed(failure)));
                        return;
                    }
                    Ok(()) => {}
                    // Every abort handle is gone; stop watching for
                    // cancellation instead of polling a closed channel.
                    Err(_) => abort_closed = true,
                }
            }
            next = handle.stream.next() => {
                // Any received item counts as activity, including partial and
                // malformed records.
                idle.as_mut().reset(tokio::time::Instant::now() + window);
                match next {
                    Some(Ok(BackendEvent::Update(update))) => {
                        debug!(stream_id = %stream_id, seq, search_id = %update.search.search_id, "search update received");
                        outcome.updates.push(update.clone());
                        let sent = send_event(&tx, StreamEvent::Update { stream_id, seq, update }).await;
                        seq = seq.saturating_add(1);
                        if !sent {
                            let _ = final_tx.send(Err(ClientError::protocol_msg("stream receiver dropped during updates")));
                            return;
                        }
                    }
                    Some(Ok(BackendEvent::Malformed { message })) => {
                        warn!(stream_id = %stream_id, %message, "skipping malformed search record");
                    }
                    Some(Ok(BackendEvent::Progress)) => {}
                    Some(Err(err)) => {
                        let failure = stream_failure_from_backend_error(&err);
                        let _ = send_event(&tx, StreamEvent::Failed { stream_id, error: failure.clone(), partial: outcome }).await;
                        let _ = final_tx.send(Err(ClientError::search_failed(failure)));
                        return;
                    }
                    None => {
                        let sent = send_event(&tx, StreamEvent::Completed { stream_id, outcome: outcome.clone() }).await;
                        let _ = final_tx.send(if sent {
                            Ok(outcome)
                        } else {
                            Err(ClientError::protocol_msg("stream receiver dropped before completion"))
                        });
                        return;
                    }
                }
            }
            () = &mut idle => {
                warn!(stream_id = %stream_id, window = ?window, "search stream idle past the inactivity window");
                let _ = send_event(&tx, StreamEvent::TimedOut { stream_id, idle: window, partial: outcome }).await;
                let _ = final_tx.send(Err(ClientError::TimedOut { idle: window }));
                // Dropping the handle closes the underlying transport;
                // nothing from the stale stream is delivered afterwards.
                return;
            }
        }
    }
}

async fn send_event(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    tx.send(event).await.is_ok()
}
