//! Logging and tracing configuration
//!
//! Snapshot runs log to stderr. A log file in the data directory can be
//! added for unattended runs.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("netsnap=info,warn"))
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing with an additional log file
///
/// Writes to `<data_dir>/logs/netsnap.log` next to stderr. The returned
/// guard must be held until exit so buffered lines are flushed. Falls back
/// to stderr only when the log directory can't be created.
pub fn init_with_file() -> Option<(PathBuf, WorkerGuard)> {
    let log_dir = match paths::log_dir() {
        Some(dir) if paths::ensure_dir(&dir).is_ok() => dir,
        _ => {
            init_cli();
            return None;
        }
    };

    let appender = tracing_appender::rolling::never(&log_dir, "netsnap.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Some((log_dir.join("netsnap.log"), guard))
}
