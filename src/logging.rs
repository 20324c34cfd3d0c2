use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_BASENAME: &str = "ocr-sync.log";
const LOG_DIR_ENV: &str = "OCR_SYNC_LOG_PATH";
const LOG_RETENTION_DAYS: u64 = 7;

/// Get the log directory path
pub fn get_log_dir() -> Result<PathBuf> {
    resolve_log_dir()
}

/// Log to a daily rolling file and to stderr.
///
/// `RUST_LOG` overrides the default level (`info`, or `debug` when verbose).
/// The returned guard flushes the file writer when dropped.
pub fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = resolve_log_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    prune_old_logs(
        &log_dir,
        Duration::from_secs(60 * 60 * 24 * LOG_RETENTION_DAYS),
    );

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_BASENAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_names(true);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(guard)
}

fn resolve_log_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let dirs = ProjectDirs::from("dev", "ocr-sync", "ocr-sync")
        .context("Failed to determine project directories for log path")?;
    Ok(dirs.state_dir().unwrap_or(dirs.data_local_dir()).join("logs"))
}

/// Delete rolled log files last modified more than `max_age` ago
fn prune_old_logs(log_dir: &Path, max_age: Duration) {
    let (Ok(entries), Some(cutoff)) = (
        std::fs::read_dir(log_dir),
        SystemTime::now().checked_sub(max_age),
    ) else {
        return;
    };

    let expired = entries.flatten().filter(|entry| {
        let is_log = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(LOG_FILE_BASENAME));
        let modified = entry
            .metadata()
            .ok()
            .filter(|meta| meta.is_file())
            .and_then(|meta| meta.modified().ok());
        is_log && modified.is_some_and(|time| time < cutoff)
    });

    for entry in expired {
        if let Err(e) = std::fs::remove_file(entry.path()) {
            eprintln!("Failed to remove old log {:?}: {}", entry.path(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_only_touches_old_log_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join(format!("{}.2026-01-01", LOG_FILE_BASENAME));
        let other = dir.path().join("notes.txt");
        let nested = dir.path().join(format!("{}.d", LOG_FILE_BASENAME));
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(&log, "old").unwrap();
        std::fs::write(&other, "keep").unwrap();

        // Nothing is older than a day yet
        prune_old_logs(dir.path(), Duration::from_secs(60 * 60 * 24));
        assert!(log.exists());

        // Everything is older than zero seconds
        std::thread::sleep(Duration::from_millis(20));
        prune_old_logs(dir.path(), Duration::ZERO);
        assert!(!log.exists());
        assert!(other.exists());
        assert!(nested.is_dir());
    }
}
