use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initializes the logging system with both console and file output.
///
/// The console layer writes to stderr so `--json` reports on stdout stay
/// machine-readable. Keep the returned guard alive until exit or buffered
/// file lines are lost.
pub fn init_logging(dir: &Path, file_name: &str, verbose: bool) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)?;

    // Daily-rotated JSON file log
    let file_appender = tracing_appender::rolling::daily(dir, file_name);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let default_level = if verbose { "baseball_db=debug" } else { "baseball_db=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}
