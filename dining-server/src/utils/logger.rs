//! Logging Infrastructure
//!
//! Structured logging to stdout, or to a daily rolling file when a log
//! directory is configured.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// File name prefix of the rolling log files
const LOG_FILE_PREFIX: &str = "dining-server";

/// Initialize the logger with defaults (`info`, stdout)
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output
///
/// `RUST_LOG` takes precedence over `log_level` when set. A missing log
/// directory is created; if that fails, logs go to stdout.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let filter = build_filter(log_level.unwrap_or("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if std::fs::create_dir_all(log_path).is_ok() {
            let file_appender = tracing_appender::rolling::daily(log_path, LOG_FILE_PREFIX);
            // try_init: a second initialization (tests, embedding) is not fatal
            let _ = subscriber.with_ansi(false).with_writer(file_appender).try_init();
            return;
        }
        eprintln!("Log directory {dir} is not usable, logging to stdout");
    }

    let _ = subscriber.try_init();
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_falls_back_on_garbage() {
        // Either RUST_LOG or the fallback; never panics
        let _ = build_filter("not a [valid filter");
        let _ = build_filter("debug,sqlx=warn");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        init_logger_with_file(Some("debug"), dir.path().join("logs").to_str());
        init_logger();
        assert!(dir.path().join("logs").exists());
    }
}
