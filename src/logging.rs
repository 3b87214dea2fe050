/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{ConfigError, LoggingConfig};

/// Initialize structured logging based on configuration
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<(), ConfigError> {
    let log_level = if verbose {
        Level::DEBUG
    } else {
        config.level.to_tracing_level()
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(log_level)))
        .map_err(|_| ConfigError::InvalidValue {
            field: "logging.level",
            reason: "cannot build a log filter from it",
        })?;

    if let Some(ref log_path) = config.file {
        init_file_logging(log_path, env_filter)?;
    } else {
        init_stderr_logging(env_filter);
    }

    Ok(())
}

fn default_directives(level: Level) -> String {
    format!("bardsong={level},bardsong_core_resilience={level}")
}

/// Initialize logging to stderr, keeping stdout for command output
fn init_stderr_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Initialize JSON logging to a file
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<(), ConfigError> {
    let file = File::create(log_path).map_err(|source| ConfigError::LogFile {
        path: log_path.to_path_buf(),
        source,
    })?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false) // No ANSI colors in file
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
