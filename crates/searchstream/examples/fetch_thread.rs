use std::sync::Arc;

use searchstream::ThreadRequest;
use searchstream::http::HttpBackend;
use searchstream::observability::init_observability;
use searchstream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    init_observability();

    let client = SearchClient::builder()
        .backend(Arc::new(HttpBackend::from_env()?))
        .build()?;

    let thread_id = std::env::args()
        .nth(1)
        .and_then(|raw| raw.parse::<uuid::Uuid>().ok())
        .ok_or_else(|| ClientError::Validation("usage: fetch_thread <thread-uuid>".into()))?;

    let view = client.thread_by_id(ThreadRequest::new(thread_id)).await?;
    println!("{} ({} searches)", view.thread.title, view.searches.len());
    for entry in &view.searches {
        println!("- {}: {}", entry.search.query, entry.search.result);
    }
    Ok(())
}
