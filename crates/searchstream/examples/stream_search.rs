use std::sync::Arc;

use searchstream::http::HttpBackend;
use searchstream::observability::init_observability;
use searchstream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    init_observability();

    let client = SearchClient::builder()
        .backend(Arc::new(HttpBackend::from_env()?))
        .build()?;

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let query = if query.trim().is_empty() {
        "latest findings on CRISPR off-target effects".to_string()
    } else {
        query
    };

    let mut stream = client
        .session(SessionConfig::named("stream"))
        .search(query)
        .start_stream()
        .await?;

    while let Some(event) = stream.next_event().await {
        match event {
            StreamEvent::Update { update, .. } => print!("{}", update.search.result),
            StreamEvent::Completed { outcome, .. } => {
                println!();
                for source in outcome.sources() {
                    println!("[{}] {}", source.title, source.url);
                }
            }
            StreamEvent::TimedOut { .. } => eprintln!("the server took too long to respond"),
            StreamEvent::Failed { error, .. } => eprintln!("search failed: {error}"),
            StreamEvent::SearchStarted { .. } => {}
        }
    }

    let _ = stream.finish().await?;
    Ok(())
}
