//! HTTP implementation of the search backend.
//!
//! Protocol notes live here so the root client API stays transport-agnostic:
//! the streaming endpoint is `GET /search?query=<text>[&thread_id=<id>]` with
//! one record per SSE `data:` line; follow-up fetches are plain JSON.
mod backend;
mod config;
pub(crate) mod sse;

pub use backend::HttpBackend;
pub use config::HttpBackendConfig;
