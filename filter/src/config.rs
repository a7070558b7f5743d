use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::debug;

use crate::error::ConfigError;

pub const OFF: &str = "off";

/// Filter configuration. Every option can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cdcfilter",
    version,
    about = "Turns GT.M journal extract lines into CDC events"
)]
pub struct FilterConfig {
    /// Journal extract to read, `stdin` for standard input.
    #[arg(long, short = 'i', default_value = "stdin")]
    pub input: String,

    /// Where parsed lines are echoed, `stdout` for standard output.
    #[arg(long, short = 'o', default_value = "stdout")]
    pub output: String,

    /// Event sink: `off`, `stdout`, or a file receiving one JSON event per line.
    #[arg(long, env = "GTMCDC_PUBLISH", default_value = OFF)]
    pub publish: String,

    /// Metrics listen address such as `127.0.0.1:9100` or `:9100`.
    #[arg(long, env = "GTMCDC_PROM_HTTP_ADDR", default_value = OFF)]
    pub metrics_addr: String,

    /// `stderr` or a log file (JSON lines).
    #[arg(long = "log", env = "GTMCDC_LOG", default_value = "stderr")]
    pub log_file: String,

    #[arg(long, env = "GTMCDC_LOG_LEVEL", default_value = "debug")]
    pub log_level: String,

    /// KEY=VALUE file loaded into the environment before options are read.
    #[arg(long, env = "GTMCDC_ENV")]
    pub env_file: Option<PathBuf>,
}

impl FilterConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(std::env::args_os())
    }

    /// Parse `args`, then re-parse once the env file (if any) is applied so
    /// its values act as defaults for unset variables.
    pub fn load_from<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let config = Self::try_parse_from(&args)?;

        let Some(path) = config.env_file.clone() else {
            return Ok(config);
        };
        apply_env_file(&path)?;
        Ok(Self::try_parse_from(&args)?)
    }

    /// `None` when metrics serving is switched off.
    pub fn metrics_socket_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        let raw = self.metrics_addr.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case(OFF) {
            return Ok(None);
        }

        let candidate = match raw.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => raw.to_string(),
        };
        candidate
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidMetricsAddr(raw.to_string()))
    }
}

/// Sets variables from `path` that are not already present in the environment.
pub fn apply_env_file(path: &Path) -> Result<(), ConfigError> {
    let env_file_error = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    for item in dotenvy::from_path_iter(path).map_err(env_file_error)? {
        let (key, value) = item.map_err(env_file_error)?;
        if std::env::var_os(&key).is_none() {
            debug!("setting {key} from {}", path.display());
            std::env::set_var(key, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    const VARS: &[&str] = &[
        "GTMCDC_PUBLISH",
        "GTMCDC_PROM_HTTP_ADDR",
        "GTMCDC_LOG",
        "GTMCDC_LOG_LEVEL",
        "GTMCDC_ENV",
    ];

    /// Serializes tests that touch `GTMCDC_*` variables and clears them.
    fn env_lock() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        let guard = LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for var in VARS {
            std::env::remove_var(var);
        }
        guard
    }

    #[test]
    fn test_defaults() {
        let _lock = env_lock();
        let config = FilterConfig::load_from(["cdcfilter"]).unwrap();

        assert_eq!(config.input, "stdin");
        assert_eq!(config.output, "stdout");
        assert_eq!(config.publish, "off");
        assert_eq!(config.metrics_addr, "off");
        assert_eq!(config.log_file, "stderr");
        assert_eq!(config.log_level, "debug");
        assert!(config.env_file.is_none());
        assert_eq!(config.metrics_socket_addr().unwrap(), None);
    }

    #[test]
    fn test_env_overrides_default_and_flag_overrides_env() {
        let _lock = env_lock();
        std::env::set_var("GTMCDC_LOG_LEVEL", "warn");
        std::env::set_var("GTMCDC_PUBLISH", "events.jsonl");

        let config = FilterConfig::load_from(["cdcfilter", "--publish", "stdout"]).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.publish, "stdout");
    }

    #[test]
    fn test_env_file_fills_unset_variables() {
        let _lock = env_lock();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# filter settings").unwrap();
        writeln!(file, "GTMCDC_PROM_HTTP_ADDR=\":9100\"").unwrap();
        writeln!(file, "export GTMCDC_LOG_LEVEL=info").unwrap();
        std::env::set_var("GTMCDC_LOG_LEVEL", "error");
        std::env::set_var("GTMCDC_ENV", file.path());

        let config = FilterConfig::load_from(["cdcfilter"]).unwrap();
        assert_eq!(config.metrics_addr, ":9100");
        assert_eq!(config.log_level, "error");
        assert_eq!(
            config.metrics_socket_addr().unwrap(),
            Some("0.0.0.0:9100".parse().unwrap())
        );
        assert_eq!(config.publish, "off");
    }

    #[test]
    fn test_env_file_syntax_error() {
        let _lock = env_lock();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "GTMCDC_LOG=x.log").unwrap();
        writeln!(file, "not a pair").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let err = FilterConfig::load_from(["cdcfilter", "--env-file", path.as_str()]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvFile {
                source: dotenvy::Error::LineParse(..),
                ..
            }
        ));
    }

    #[test]
    fn test_missing_env_file() {
        let _lock = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.env");

        let err = FilterConfig::load_from(["cdcfilter", "--env-file", path.to_str().unwrap()])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvFile {
                source: dotenvy::Error::Io(_),
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_metrics_addr() {
        let _lock = env_lock();
        let config = FilterConfig::load_from(["cdcfilter", "--metrics-addr", "nowhere"]).unwrap();
        assert!(matches!(
            config.metrics_socket_addr(),
            Err(ConfigError::InvalidMetricsAddr(_))
        ));
    }
}
