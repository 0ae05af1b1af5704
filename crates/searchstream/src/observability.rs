use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

/// Log destination resolved from the environment.
enum LogSink {
    Stdout,
    JsonFile(PathBuf),
}

fn disabled_by_env() -> bool {
    [
        "SEARCHSTREAM_OBSERVABILITY_ENABLED",
        "SEARCHSTREAM_OBSERVABILITY",
    ]
    .iter()
    .find_map(|key| std::env::var(key).ok())
    .is_some_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off" | "disabled"
        )
    })
}

fn env_filter() -> EnvFilter {
    std::env::var("SEARCHSTREAM_LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn log_sink() -> LogSink {
    match std::env::var("SEARCHSTREAM_JSON_LOG_PATH") {
        Ok(path) if !path.trim().is_empty() => LogSink::JsonFile(PathBuf::from(path)),
        _ => LogSink::Stdout,
    }
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `SEARCHSTREAM_OBSERVABILITY_ENABLED` / `SEARCHSTREAM_OBSERVABILITY`: enable/disable flag (default enabled).
/// - `SEARCHSTREAM_LOG_LEVEL`: level/filter override (`info`, `debug`, a full filter directive).
/// - `SEARCHSTREAM_JSON_LOG_PATH`: when set, logs are written as JSONL to that file
///   instead of the human-readable stdout format.
/// - `RUST_LOG`: fallback filter override.
pub fn init_observability() {
    INIT.get_or_init(|| {
        if disabled_by_env() {
            return;
        }

        let registry = tracing_subscriber::registry().with(env_filter());
        match log_sink() {
            LogSink::JsonFile(path) => {
                let dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => {
                        let _ = std::fs::create_dir_all(parent);
                        parent
                    }
                    _ => std::path::Path::new("."),
                };
                let file_name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("searchstream.logs.jsonl");
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = registry.with(layer).try_init();
            }
            LogSink::Stdout => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stdout);
                let _ = registry.with(layer).try_init();
            }
        }
    });
}
