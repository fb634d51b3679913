//! Tracing subscriber setup.
//!
//! The engine only emits `tracing` events; embedding hosts decide where they
//! go. These helpers cover the two common cases. Both are safe to call more
//! than once: a second call leaves the first subscriber in place.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "trad_rack.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Log to a daily-rotated file in `dir`.
///
/// The returned guard flushes the background writer on drop and must be kept
/// alive for as long as logging is needed. `None` means a global subscriber
/// was already installed.
pub fn init_file_logging(dir: &Path) -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .ok()
        .map(|()| guard)
}
