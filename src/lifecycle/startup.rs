//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the API description and build the coverage engine
//! - Launch the ingestion worker before any traffic arrives
//! - Bind listeners, serve, and run the ordered shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)
//! - Report dump failures are logged, not returned

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::coverage::CoverageEngine;
use crate::error::StartupError;
use crate::http::{HttpForwarder, HttpServer};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::pipeline::AnalysisPipeline;
use crate::report::run_report_server;
use crate::spec::load_spec;

/// Upper bound on waiting for the ingestion worker at shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Serve until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<Arc<CoverageEngine>, StartupError> {
    run_until(config, signals::wait_for_signal()).await
}

/// Serve until `stop` resolves, then shut down in order.
///
/// Returns the engine so callers can inspect the final coverage.
pub async fn run_until<F>(config: ProxyConfig, stop: F) -> Result<Arc<CoverageEngine>, StartupError>
where
    F: Future<Output = ()>,
{
    let spec = load_spec(Path::new(&config.openapi.file))?;
    let engine = Arc::new(CoverageEngine::new(&spec, &config.coverage.min_variants)?);

    let upstream_timeout = Duration::from_secs(config.timeouts.request_secs);
    let forwarder = HttpForwarder::new(&config.forward.url, upstream_timeout)?;
    tracing::info!(target = %config.forward.url, "Forwarding to upstream");

    let pipeline = Arc::new(AnalysisPipeline::new(
        forwarder,
        Arc::clone(&engine),
        &config.analysis,
    ));
    pipeline.launch().map_err(StartupError::Worker)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = bind(&config.listener.bind_address).await?;
    let report_listener = match &config.report.bind_address {
        Some(address) => Some(bind(address).await?),
        None => None,
    };

    let shutdown = Shutdown::new();

    // Outer bound only; the forwarder answers 504 first.
    let server = HttpServer::new(Arc::clone(&pipeline), upstream_timeout + Duration::from_secs(1));
    let mut proxy_task = tokio::spawn(server.run(listener, shutdown.subscribe()));
    let report_task = report_listener.map(|listener| {
        tokio::spawn(run_report_server(
            Arc::clone(&engine),
            listener,
            shutdown.subscribe(),
        ))
    });

    let early_exit = tokio::select! {
        _ = stop => None,
        result = &mut proxy_task => Some(result),
    };

    shutdown.trigger();
    let proxy_result = match early_exit {
        Some(result) => result,
        None => proxy_task.await,
    };
    log_task_result("proxy", proxy_result);
    if let Some(task) = report_task {
        log_task_result("report", task.await);
    }

    pipeline.shutdown(DRAIN_TIMEOUT).await;
    if pipeline.dropped() > 0 {
        tracing::warn!(dropped = pipeline.dropped(), "Some exchanges were never analysed");
    }

    if let Some(file) = &config.report.output_file {
        if let Err(e) = engine.dump_to_file(Path::new(file)) {
            tracing::error!(path = %file, error = %e, "Failed to write coverage report");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(engine)
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

fn log_task_result(
    name: &str,
    result: Result<Result<(), std::io::Error>, tokio::task::JoinError>,
) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(server = name, error = %e, "Server stopped with error"),
        Err(e) => tracing::error!(server = name, error = %e, "Server task failed"),
    }
}
