use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum accepted search query length, matching the service-side validator.
pub const MAX_QUERY_LENGTH: usize = 300;

/// One search row as the service reports it.
///
/// `result` is an incremental answer fragment: concatenating the fragments of
/// a stream generation in arrival order yields the answer text so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Search {
    pub search_id: Uuid,
    /// Conversation this search belongs to. Stable across the whole stream.
    pub thread_id: Uuid,
    /// The original user query.
    pub query: String,
    pub result: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cited document backing part of an answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// One decoded stream record: an answer fragment plus the sources backing it.
///
/// The fetch-by-id endpoint returns the same shape for a finished search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchUpdate {
    pub search: Search,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Accumulated updates for one stream generation, in arrival order.
///
/// Updates are never reordered or deduplicated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub updates: Vec<SearchUpdate>,
}

impl SearchOutcome {
    /// Concatenates the answer fragments in arrival order.
    pub fn result_text(&self) -> String {
        let mut out = String::new();
        for update in &self.updates {
            out.push_str(&update.search.result);
        }
        out
    }

    /// Iterates all sources in arrival order.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.updates.iter().flat_map(|update| update.sources.iter())
    }

    /// Returns the most recent update, if any.
    pub fn last(&self) -> Option<&SearchUpdate> {
        self.updates.last()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// The search id the service assigned, once at least one update arrived.
    pub fn search_id(&self) -> Option<Uuid> {
        self.updates.first().map(|update| update.search.search_id)
    }

    /// The thread this search belongs to, once at least one update arrived.
    pub fn thread_id(&self) -> Option<Uuid> {
        self.updates.first().map(|update| update.search.thread_id)
    }
}

/// Generic stream behavior options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Window after which a silent stream is aborted. Measured since the last
    /// received chunk, not since stream start, so long but steadily
    /// progressing streams are not killed.
    pub inactivity_timeout: Duration,
    /// Bounded event buffer size used by the streaming channel.
    pub event_buffer_capacity: usize,
    /// Optional cap on the whole streaming request lifetime.
    pub request_timeout: Option<Duration>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(5),
            event_buffer_capacity: 128,
            request_timeout: None,
        }
    }
}

/// Fully validated request handed to a backend.
#[derive(Clone, Debug)]
pub struct StreamRequest {
    pub stream_id: Uuid,
    pub session_id: Uuid,
    /// Trimmed, non-empty query text.
    pub query: String,
    pub thread_id: Option<Uuid>,
    pub options: StreamOptions,
}

/// A conversation grouping sequential searches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A thread together with its searches, oldest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadView {
    pub thread: Thread,
    pub searches: Vec<SearchUpdate>,
}

/// Parameters for fetching one thread.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ThreadRequest {
    pub thread_id: Uuid,
    pub limit: Option<u8>,
    pub offset: Option<u8>,
}

impl ThreadRequest {
    pub fn new(thread_id: Uuid) -> Self {
        Self {
            thread_id,
            limit: None,
            offset: None,
        }
    }

    pub fn limit(mut self, limit: u8) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u8) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Parameters for paging through past searches.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub limit: Option<u8>,
    pub offset: Option<u8>,
}

impl HistoryRequest {
    pub fn limit(mut self, limit: u8) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u8) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A thumbs-up/down reaction to a finished search.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ReactionRequest {
    pub search_id: Uuid,
    pub reaction: bool,
}
