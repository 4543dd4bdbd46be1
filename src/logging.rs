//! Logging setup for the application.
//!
//! Installs a global tracing subscriber that writes to stdout and to a
//! per-launch file under the app's logs directory. Pruning of old launch
//! files is best-effort: a cluttered logs folder is not worth refusing to
//! start logging over.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Launch files kept after pruning.
const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "leafscope";
const LOG_FILE_EXT: &str = "log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Errors that may occur while initializing logging.
///
/// Only the failures that abort subscriber installation appear here;
/// pruning problems are reported and swallowed.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The logs directory could not be resolved or created.
    #[error("Cannot prepare the logs directory: {0}")]
    LogsDir(#[from] app_dirs::AppDirError),
    /// The launch timestamp could not be formatted into a filename.
    #[error("Failed to format log filename time: {0}")]
    FormatTime(#[from] time::error::Format),
    /// Another subscriber is already installed globally.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize tracing to write to stdout and a per-launch log file.
///
/// Subsequent calls are no-ops. Failures are returned so callers can degrade
/// gracefully without aborting startup; the app runs fine without a log file.
pub fn init() -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let log_dir = app_dirs::logs_dir()?;
    let file_name = launch_file_name(now_local_or_utc())?;
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&log_dir, &file_name));
    let pruned = prune_launch_files(&log_dir, MAX_LOG_FILES);

    let timer = local_timer();
    let subscriber = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_writer(std::io::stdout),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!(
        "Logging to {}; pruned {pruned} old launch logs",
        log_dir.join(&file_name).display()
    );
    Ok(())
}

/// Filename for this launch, e.g. `leafscope_2023-11-14_22-13-20.log`.
fn launch_file_name(now: OffsetDateTime) -> Result<String, time::error::Format> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now.format(NAME_FORMAT)?;
    Ok(format!("{LOG_FILE_PREFIX}_{stamp}.{LOG_FILE_EXT}"))
}

/// Delete launch files beyond the `keep` newest. Returns how many went.
///
/// Runs before the subscriber is installed, so problems go to stderr.
fn prune_launch_files(dir: &Path, keep: usize) -> usize {
    let mut files = match launch_files_newest_first(dir) {
        Ok(files) => files,
        Err(error) => {
            eprintln!("Skipping log pruning in {}: {error}", dir.display());
            return 0;
        }
    };
    let stale = files.split_off(keep.min(files.len()));
    let mut pruned = 0;
    for path in stale {
        match fs::remove_file(&path) {
            Ok(()) => pruned += 1,
            Err(error) => eprintln!("Failed to remove old log {}: {error}", path.display()),
        }
    }
    pruned
}

fn launch_files_newest_first(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut stamped: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_launch_file(path))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    stamped.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(stamped.into_iter().map(|(_, path)| path).collect())
}

/// Only `leafscope_*.log` files are pruning candidates; anything else a user
/// drops into the folder is left alone.
fn is_launch_file(path: &Path) -> bool {
    let named_like_launch = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.starts_with(LOG_FILE_PREFIX));
    let log_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == LOG_FILE_EXT);
    named_like_launch && log_extension && path.is_file()
}

fn local_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
