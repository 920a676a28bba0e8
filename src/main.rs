use clap::Parser;

use api_coverage_proxy::config::{read_config, validate_config, CliArgs, ConfigError, ProxyConfig};
use api_coverage_proxy::lifecycle;
use api_coverage_proxy::observability::init_logging;
use api_coverage_proxy::StartupError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    args.apply(&mut config);

    init_logging(&config.observability.log_level);
    tracing::info!("api-coverage-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(StartupError::Config(ConfigError::Validation(errors)).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        openapi_file = %config.openapi.file,
        forward_url = %config.forward.url,
        report_address = ?config.report.bind_address,
        queue_capacity = config.analysis.queue_capacity,
        "Configuration loaded"
    );

    lifecycle::run(config).await?;
    Ok(())
}
