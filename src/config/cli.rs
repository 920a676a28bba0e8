//! Command line and environment overrides.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::ProxyConfig;

/// Reverse proxy that measures live API coverage against an OpenAPI document.
#[derive(Debug, Parser)]
#[command(name = "api-coverage-proxy", version, about, long_about = None)]
pub struct CliArgs {
    /// TOML configuration file.
    #[arg(short, long, env = "COVERAGE_PROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Swagger 2.0 / OpenAPI 3.x document to measure coverage against.
    #[arg(long, env = "OPENAPI_FILE")]
    pub openapi_file: Option<String>,

    /// Backend URL every request is forwarded to.
    #[arg(long, env = "FORWARD_URL")]
    pub forward_url: Option<String>,

    /// Proxy listen address.
    #[arg(long, env = "LISTEN_ADDRESS")]
    pub listen: Option<String>,

    /// Report endpoint listen address.
    #[arg(long, env = "REPORT_ADDRESS")]
    pub report_address: Option<String>,

    /// File the coverage report is written to on shutdown.
    #[arg(long, env = "REPORT_FILE")]
    pub report_file: Option<String>,

    /// Log level.
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Overlay flags and environment variables on top of file configuration.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(file) = &self.openapi_file {
            config.openapi.file = file.clone();
        }
        if let Some(url) = &self.forward_url {
            config.forward.url = url.clone();
        }
        if let Some(listen) = &self.listen {
            config.listener.bind_address = listen.clone();
        }
        if let Some(addr) = &self.report_address {
            config.report.bind_address = Some(addr.clone());
        }
        if let Some(file) = &self.report_file {
            config.report.output_file = Some(file.clone());
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}
