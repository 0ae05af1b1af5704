use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::backend::{BackendEvent, BackendResponseMeta, BackendStreamHandle, SearchBackend};
use crate::errors::{BackendError, ClientError};
use crate::models::{
    HistoryRequest, ReactionRequest, Search, SearchUpdate, StreamRequest, ThreadRequest,
    ThreadView,
};

use super::config::HttpBackendConfig;
use super::sse::{SseDecoder, record_to_event};

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// `SearchBackend` implementation speaking HTTP to the search service.
pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    /// Creates a backend from explicit configuration.
    pub fn new(config: HttpBackendConfig) -> Result<Self, ClientError> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::Config(
                "HTTP backend base_url must not be empty".into(),
            ));
        }
        // No client-level timeout: it would cap the total lifetime of a
        // streaming response. Non-streaming calls set it per request.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a backend using `SEARCHSTREAM_API_URL`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(HttpBackendConfig::from_env()?)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(
            self.client
                .get(self.config.endpoint(path))
                .timeout(self.config.timeout),
        )
    }

    fn patch(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(
            self.client
                .patch(self.config.endpoint(path))
                .timeout(self.config.timeout),
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait::async_trait]
impl SearchBackend for HttpBackend {
    async fn open_stream(&self, req: StreamRequest) -> Result<BackendStreamHandle, BackendError> {
        debug!(stream_id = %req.stream_id, session_id = %req.session_id, "opening search stream");

        let mut http_req = self
            .client
            .get(self.config.endpoint("search"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .query(&[("query", req.query.as_str())]);
        if let Some(thread_id) = req.thread_id {
            http_req = http_req.query(&[("thread_id", thread_id.to_string())]);
        }
        http_req = self.authorize(http_req);
        if let Some(timeout) = req.options.request_timeout {
            http_req = http_req.timeout(timeout);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| BackendError::transport(format!("search request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendError::api(
                format!("search request failed with status {status}: {body}"),
                Some(status.as_u16()),
            ));
        }
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(BackendStreamHandle {
            stream: Box::pin(search_event_stream(bytes_stream)),
            meta: BackendResponseMeta { request_id },
        })
    }

    async fn search_by_id(&self, search_id: Uuid) -> Result<SearchUpdate, BackendError> {
        fetch_json(
            self.get("search/one")
                .query(&[("search_id", search_id.to_string())]),
        )
        .await
    }

    async fn thread_by_id(&self, req: ThreadRequest) -> Result<ThreadView, BackendError> {
        let mut request = self
            .get("search/thread")
            .query(&[("thread_id", req.thread_id.to_string())]);
        if let Some(limit) = req.limit {
            request = request.query(&[("limit", limit.to_string())]);
        }
        if let Some(offset) = req.offset {
            request = request.query(&[("offset", offset.to_string())]);
        }
        fetch_json(request).await
    }

    async fn search_history(&self, req: HistoryRequest) -> Result<Vec<Search>, BackendError> {
        let mut request = self.get("search/history");
        if let Some(limit) = req.limit {
            request = request.query(&[("limit", limit.to_string())]);
        }
        if let Some(offset) = req.offset {
            request = request.query(&[("offset", offset.to_string())]);
        }
        fetch_json(request).await
    }

    async fn send_reaction(&self, req: ReactionRequest) -> Result<Search, BackendError> {
        fetch_json(self.patch("search/reaction").json(&req)).await
    }
}

async fn fetch_json<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> Result<T, BackendError> {
    let response = req
        .send()
        .await
        .map_err(|e| BackendError::transport(format!("request failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(BackendError::api(
            format!("request failed with status {status}: {body}"),
            Some(status.as_u16()),
        ));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::decode(format!("invalid response body: {e}")))
}

fn search_event_stream(
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<BackendEvent, BackendError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<BackendEvent>,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        let records = state.decoder.push_chunk(&chunk);
                        if records.is_empty() {
                            // Bytes arrived without completing a record;
                            // still counts as stream activity.
                            state.pending.push_back(BackendEvent::Progress);
                        }
                        for record in &records {
                            state.pending.push_back(record_to_event(record));
                        }
                        continue;
                    }
                    Some(Err(e)) => {
                        return Err(BackendError::transport(format!(
                            "search stream read failed: {e}"
                        )));
                    }
                    None => {
                        if let Some(record) = state.decoder.finish() {
                            state.pending.push_back(record_to_event(&record));
                        }
                        state.done = true;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt as _;

    fn byte_stream(chunks: Vec<bytes::Bytes>) -> ByteStream {
        Box::pin(stream::iter(chunks.into_iter().map(Ok)))
    }

    fn record_line() -> &'static str {
        concat!(
            r#"data: {"search":{"search_id":"7f2c1e7e-48ef-44d4-b5e9-cbe9a9d4c2aa","#,
            r#""thread_id":"f2a24963-9cd0-4bd7-9f39-83a0c7f1d64d","query":"q","result":"r","#,
            r#""created_at":"2024-05-01T12:00:00Z","updated_at":"2024-05-01T12:00:01Z"},"sources":[]}"#,
        )
    }

    #[tokio::test]
    async fn event_stream_decodes_records_and_flushes_the_tail() {
        // Second record is delivered without a trailing newline.
        let body = format!("{}\n{}", record_line(), record_line());
        let stream = search_event_stream(byte_stream(vec![bytes::Bytes::from(body.into_bytes())]));
        let events: Vec<BackendEvent> = stream
            .filter_map(|item| async move { item.ok() })
            .collect()
            .await;
        let updates = events
            .iter()
            .filter(|event| matches!(event, BackendEvent::Update(_)))
            .count();
        assert_eq!(updates, 2);
    }

    #[tokio::test]
    async fn chunks_without_complete_records_surface_as_progress() {
        let stream = search_event_stream(byte_stream(vec![
            bytes::Bytes::from_static(b"data: {\"sea"),
            bytes::Bytes::from_static(b"rch\""),
        ]));
        let events: Vec<BackendEvent> = stream
            .filter_map(|item| async move { item.ok() })
            .collect()
            .await;
        // Two partial chunks, then the flushed tail fails to decode.
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, BackendEvent::Progress))
                .count(),
            2
        );
        assert!(matches!(events.last(), Some(BackendEvent::Malformed { .. })));
    }

    #[test]
    fn builder_rejects_empty_base_url() {
        let result = HttpBackend::new(HttpBackendConfig::new("  "));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
