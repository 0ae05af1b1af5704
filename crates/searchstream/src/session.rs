use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::client::ClientInner;
use crate::ingest::{SearchBuilder, StreamSlot};

/// Configuration used to create a `SearchSession`.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Human-readable session name (useful for logs).
    pub name: String,
}

impl SessionConfig {
    /// Creates a named session config.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Logical grouping for related searches.
///
/// A session allows at most one in-flight stream: starting a new search
/// cancels the previous one before the replacement opens its transport.
/// Sessions are lightweight and in-memory only.
#[derive(Clone)]
pub struct SearchSession {
    client: Arc<ClientInner>,
    session_id: Uuid,
    config: SessionConfig,
    slot: StreamSlot,
}

impl SearchSession {
    pub(crate) fn new(client: Arc<ClientInner>, config: SessionConfig) -> Self {
        Self {
            client,
            session_id: Uuid::new_v4(),
            config,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns this session's id.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Starts building a streaming search for `query`.
    pub fn search(&self, query: impl Into<String>) -> SearchBuilder {
        SearchBuilder::new(
            self.client.clone(),
            self.session_id,
            self.config.name.clone(),
            self.slot.clone(),
            query.into(),
            self.client.default_options(),
        )
    }

    /// Cancels the in-flight stream, if any.
    pub fn cancel_active(&self) {
        if let Some(handle) = self.slot.lock().expect("stream slot poisoned").take() {
            handle.abort();
        }
    }
}
