use std::env;
use std::path::Path;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "clip-sync.log";

/// Sets up logging to stderr, plus a file layer when `log_file` is given or
/// `debug` is set. Keep the returned guard alive until exit so the file
/// writer gets flushed.
pub fn init_logger(debug: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    // `TRACING_LEVEL` wins over the --debug switch
    let default_filter = if debug { "debug" } else { "warn" };
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| default_filter.to_string());
    let filter_layer = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stderr keeps stdout for the summary table and print-config
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(false)
        .without_time()
        .with_target(false)
        .with_ansi(true);

    let log_file = match (log_file, debug) {
        (Some(path), _) => Some(path.to_path_buf()),
        (None, true) => Some(Path::new(DEFAULT_LOG_FILE).to_path_buf()),
        (None, false) => None,
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| DEFAULT_LOG_FILE.into());
            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(filter_layer)
        .try_init();

    debug!("Tracing is configured");
    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_layer_only_with_a_log_file_or_debug() {
        assert!(init_logger(false, None).is_none());

        let dir = tempdir().unwrap();
        let guard = init_logger(false, Some(&dir.path().join("sync.log")));
        assert!(guard.is_some());
    }
}
