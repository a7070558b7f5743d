use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::FilterError;

/// Log file used when stderr would interleave with echoed output on a terminal.
pub const TTY_LOG_FILE: &str = "cdcfilter.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Resolve the configured log destination.
pub fn resolve_log_target(log_file: &str, stdout_is_tty: bool) -> LogTarget {
    if log_file.eq_ignore_ascii_case("stderr") {
        if stdout_is_tty {
            LogTarget::File(PathBuf::from(TTY_LOG_FILE))
        } else {
            LogTarget::Stderr
        }
    } else {
        LogTarget::File(PathBuf::from(log_file))
    }
}

/// `RUST_LOG` wins over the configured level.
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("cdcfilter={log_level},tower_http=info").into()
    })
}

pub fn init_logging(log_file: &str, log_level: &str) -> Result<LogTarget, FilterError> {
    let target = resolve_log_target(log_file, std::io::stdout().is_terminal());
    let registry = tracing_subscriber::registry().with(build_filter(log_level));

    let result = match &target {
        LogTarget::Stderr => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    FilterError::Logging(format!("cannot open {}: {e}", path.display()))
                })?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
    };

    result.map_err(|e| FilterError::Logging(e.to_string()))?;
    Ok(target)
}
