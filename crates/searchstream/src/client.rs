use std::sync::Arc;

use uuid::Uuid;

use crate::backend::SearchBackend;
use crate::errors::ClientError;
use crate::models::{
    HistoryRequest, ReactionRequest, Search, SearchUpdate, StreamOptions, ThreadRequest,
    ThreadView,
};
use crate::session::{SearchSession, SessionConfig};

pub(crate) struct ClientInner {
    backend: Arc<dyn SearchBackend>,
    defaults: StreamOptions,
}

impl ClientInner {
    pub(crate) fn backend(&self) -> Arc<dyn SearchBackend> {
        self.backend.clone()
    }

    pub(crate) fn default_options(&self) -> StreamOptions {
        self.defaults.clone()
    }
}

/// Entry point for creating sessions and talking to the search service.
#[derive(Clone)]
pub struct SearchClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl SearchClient {
    /// Starts a builder for registering a backend and creating a client.
    pub fn builder() -> SearchClientBuilder {
        SearchClientBuilder::default()
    }

    /// Creates a logical session for grouping related searches.
    pub fn session(&self, config: SessionConfig) -> SearchSession {
        SearchSession::new(self.inner.clone(), config)
    }

    /// Fetches one finished search with its sources.
    ///
    /// This is the follow-up call the product issues once a stream reports
    /// `Completed`.
    pub async fn search_by_id(&self, search_id: Uuid) -> Result<SearchUpdate, ClientError> {
        Ok(self.inner.backend.search_by_id(search_id).await?)
    }

    /// Fetches a thread together with its searches.
    pub async fn thread_by_id(&self, req: ThreadRequest) -> Result<ThreadView, ClientError> {
        Ok(self.inner.backend.thread_by_id(req).await?)
    }

    /// Pages through the caller's past searches, newest first.
    pub async fn search_history(&self, req: HistoryRequest) -> Result<Vec<Search>, ClientError> {
        Ok(self.inner.backend.search_history(req).await?)
    }

    /// Records a thumbs-up/down reaction and returns the updated search.
    pub async fn send_reaction(
        &self,
        search_id: Uuid,
        reaction: bool,
    ) -> Result<Search, ClientError> {
        Ok(self
            .inner
            .backend
            .send_reaction(ReactionRequest {
                search_id,
                reaction,
            })
            .await?)
    }
}

/// Builder used to register a backend before creating a `SearchClient`.
#[derive(Default)]
pub struct SearchClientBuilder {
    backend: Option<Arc<dyn SearchBackend>>,
    defaults: StreamOptions,
}

impl SearchClientBuilder {
    /// Registers the backend all sessions of this client will use.
    pub fn backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Overrides the default stream options inherited by new searches.
    pub fn default_stream_options(mut self, options: StreamOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Builds the client and validates its configuration.
    pub fn build(self) -> Result<SearchClient, ClientError> {
        let backend = self
            .backend
            .ok_or_else(|| ClientError::Config("a search backend must be registered".into()))?;
        if self.defaults.event_buffer_capacity == 0 {
            return Err(ClientError::Config(
                "default event_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(SearchClient {
            inner: Arc::new(ClientInner {
                backend,
                defaults: self.defaults,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendStreamHandle;
    use crate::errors::BackendError;
    use crate::models::{Source, StreamRequest};
    use chrono::DateTime;
    use std::collections::HashMap;

    struct CannedBackend {
        update: SearchUpdate,
    }

    fn canned_update() -> SearchUpdate {
        SearchUpdate {
            search: Search {
                search_id: Uuid::from_u128(0x10),
                thread_id: Uuid::from_u128(0x20),
                query: "q".into(),
                result: "done".into(),
                created_at: DateTime::UNIX_EPOCH,
                updated_at: DateTime::UNIX_EPOCH,
            },
            sources: vec![Source {
                url: "https://example.org".into(),
                title: "Example".into(),
                description: String::new(),
                metadata: HashMap::new(),
            }],
        }
    }

    #[async_trait::async_trait]
    impl SearchBackend for CannedBackend {
        async fn open_stream(
            &self,
            _req: StreamRequest,
        ) -> Result<BackendStreamHandle, BackendError> {
            Err(BackendError::transport("not used in this test"))
        }

        async fn search_by_id(&self, _search_id: Uuid) -> Result<SearchUpdate, BackendError> {
            Ok(self.update.clone())
        }

        async fn thread_by_id(&self, _req: ThreadRequest) -> Result<ThreadView, BackendError> {
            Err(BackendError::api("no such thread", Some(404)))
        }

        async fn search_history(&self, _req: HistoryRequest) -> Result<Vec<Search>, BackendError> {
            Ok(vec![self.update.search.clone()])
        }

        async fn send_reaction(&self, req: ReactionRequest) -> Result<Search, BackendError> {
            let mut search = self.update.search.clone();
            search.search_id = req.search_id;
            Ok(search)
        }
    }

    fn canned_client() -> SearchClient {
        SearchClient::builder()
            .backend(Arc::new(CannedBackend {
                update: canned_update(),
            }))
            .build()
            .expect("build client")
    }

    #[test]
    fn build_rejects_missing_backend() {
        let result = SearchClient::builder().build();
        assert!(
            matches!(result, Err(ClientError::Config(message)) if message.contains("backend"))
        );
    }

    #[tokio::test]
    async fn search_by_id_delegates_to_backend() {
        let client = canned_client();
        let update = client
            .search_by_id(Uuid::from_u128(0x10))
            .await
            .expect("fetch");
        assert_eq!(update.search.result, "done");
        assert_eq!(update.sources.len(), 1);
    }

    #[tokio::test]
    async fn backend_api_errors_surface_as_backend_errors() {
        let client = canned_client();
        let err = client
            .thread_by_id(ThreadRequest::new(Uuid::from_u128(0x99)))
            .await;
        assert!(matches!(
            err,
            Err(ClientError::Backend(BackendError::Api {
                status_code: Some(404),
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn send_reaction_returns_the_updated_search() {
        let client = canned_client();
        let search = client
            .send_reaction(Uuid::from_u128(0x42), true)
            .await
            .expect("react");
        assert_eq!(search.search_id, Uuid::from_u128(0x42));
    }
}
