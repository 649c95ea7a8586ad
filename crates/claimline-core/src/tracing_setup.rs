use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable naming a file to append debug logs to
pub const LOG_FILE_ENV: &str = "CLAIMLINE_LOG_FILE";

const DEFAULT_FILTER: &str = "claimline_core=info,claimline=info,reqwest=warn,hyper=warn";

pub fn init_tracing() {
    init_tracing_with_level(None);
}

/// Install the global subscriber: stderr output filtered by `RUST_LOG` (or
/// `level`, or the default), plus a debug-level file layer when
/// `CLAIMLINE_LOG_FILE` is set. Safe to call more than once.
pub fn init_tracing_with_level(level: Option<&str>) {
    let filter = || match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter());

    let registry = tracing_subscriber::registry().with(stderr_layer);

    let file = std::env::var(LOG_FILE_ENV)
        .ok()
        .and_then(|path| match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some((path, file)),
            Err(e) => {
                eprintln!("Could not open log file {}: {}", path, e);
                None
            }
        });

    let result = if let Some((path, file)) = file {
        let file_layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

        let result = registry.with(file_layer).try_init();
        if result.is_ok() {
            eprintln!("File logging enabled: {}", path);
        }
        result
    } else {
        registry.try_init()
    };

    if let Err(e) = result {
        // Already initialized (e.g. by a test harness)
        tracing::debug!("Tracing subscriber not installed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing_with_level(Some("debug"));
        init_tracing();
        tracing::info!("still logging");
    }
}
