//! Reporting surface.
//!
//! # Responsibilities
//! - Serve the current coverage report as JSON
//! - Run on its own listener, sharing the proxy's shutdown signal

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::coverage::CoverageEngine;
use self::handlers::get_report;

pub fn setup_report_router(engine: Arc<CoverageEngine>) -> Router {
    Router::new()
        .route("/", get(get_report))
        .route("/report", get(get_report))
        .with_state(engine)
}

/// Serve the report router until `shutdown` fires.
pub async fn run_report_server(
    engine: Arc<CoverageEngine>,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Report server starting");

    axum::serve(listener, setup_report_router(engine))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Report server stopped");
    Ok(())
}
