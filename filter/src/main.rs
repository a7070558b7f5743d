mod config;
mod error;
mod filter;
mod logging;
mod metrics;
mod publisher;
mod routes;
mod streams;

use std::process::ExitCode;
use std::sync::Arc;

use config::FilterConfig;
use error::{ConfigError, FilterError};
use metrics::Metrics;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match FilterConfig::load() {
        Ok(config) => config,
        // --help, --version and usage errors
        Err(ConfigError::Args(e)) => e.exit(),
        Err(e) => {
            eprintln!("cdcfilter: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.log_file, &config.log_level) {
        eprintln!("cdcfilter: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: FilterConfig) -> Result<(), FilterError> {
    info!(?config, "Starting cdcfilter");

    let metrics = Arc::new(Metrics::new());
    if let Some(addr) = config.metrics_socket_addr()? {
        let metrics = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = routes::serve_metrics(addr, metrics).await {
                warn!("{}", e);
            }
        });
    }

    let publisher = publisher::publisher_for_target(&config.publish)?;
    let input = streams::open_input(&config.input).await?;
    let output = streams::open_output(&config.output).await?;

    let summary = filter::run_filter(input, output, publisher.as_ref(), &metrics).await?;
    info!(
        summary = %serde_json::to_string(&summary).unwrap_or_default(),
        "Journal extract processed"
    );
    Ok(())
}
