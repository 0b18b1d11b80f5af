use std::time::{Duration, SystemTime};

use camino::Utf8Path;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "skin-hunter";

const DEFAULT_FILTER: &str =
    "skin_hunter=info,ltk_skin_manager=info,ltk_overlay_supervisor=info,ltk_skin_registry=info";

const VERBOSE_FILTER: &str =
    "skin_hunter=debug,ltk_skin_manager=debug,ltk_overlay_supervisor=debug,ltk_skin_registry=debug";

/// Installs the console (stderr) and daily file loggers.
///
/// `RUST_LOG` overrides the default filter. The returned guard flushes the
/// file writer when dropped and must live until exit.
pub fn init_logging(log_dir: Option<&Utf8Path>, verbose: bool) -> Option<WorkerGuard> {
    let default_filter = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_guard, file_layer) = match log_dir.map(file_appender) {
        Some(Ok(appender)) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(guard), Some(layer))
        }
        Some(Err(e)) => {
            eprintln!("Failed to set up file logging: {e}");
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    file_guard
}

fn file_appender(log_dir: &Utf8Path) -> Result<rolling::RollingFileAppender, String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("cannot create log directory {log_dir}: {e}"))?;

    rolling::RollingFileAppender::builder()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| e.to_string())
}

/// Deletes dated log files older than `max_age_days`. Returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Utf8Path, max_age_days: u64) -> usize {
    let max_age = Duration::from_secs(max_age_days * 24 * 60 * 60);

    let entries = match log_dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %log_dir, error = %e, "Failed to read log directory for cleanup");
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        // e.g. "skin-hunter.2026-02-17.log"
        if !name.starts_with(&format!("{LOG_FILE_PREFIX}.")) || !name.ends_with(".log") {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok());
        if !age.is_some_and(|age| age > max_age) {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                tracing::info!(path = %entry.path(), "Deleted old log file");
                removed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %entry.path(), error = %e, "Failed to delete old log file")
            }
        }
    }
    removed
}
