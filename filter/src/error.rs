use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialize logging: {0}")]
    Logging(String),
    #[error("failed to open input `{path}`: {source}")]
    OpenInput {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open output `{path}`: {source}")]
    OpenOutput {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read journal extract: {0}")]
    Read(#[source] io::Error),
    #[error("line {line_number}: {source}")]
    Serialize {
        line_number: u64,
        #[source]
        source: journal_parser::SerializeError,
    },
    #[error("publisher error: {0}")]
    Publish(#[from] PublishError),
    #[error("metrics server failed on {addr}: {source}")]
    MetricsServer {
        addr: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddr(String),
    #[error(transparent)]
    Args(#[from] clap::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to open publish target `{path}`: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write event: {0}")]
    Write(#[from] io::Error),
    #[error("publisher `{0}` is disabled")]
    Disabled(&'static str),
}
