//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router that sends every request through the analysis pipeline
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve on a bound listener until shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics;
use crate::pipeline::{AnalysisPipeline, ExchangeProcessor, ForwardHandler};

/// HTTP server for the coverage proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new<H: ForwardHandler, P: ExchangeProcessor>(
        pipeline: Arc<AnalysisPipeline<H, P>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            router: proxy_router(pipeline, request_timeout),
        }
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Proxy server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}

/// Router handing every method and path to the pipeline.
#[allow(deprecated)]
pub fn proxy_router<H: ForwardHandler, P: ExchangeProcessor>(
    pipeline: Arc<AnalysisPipeline<H, P>>,
    request_timeout: Duration,
) -> Router {
    Router::new()
        .fallback(proxy_handler::<H, P>)
        .with_state(pipeline)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
        .layer(TraceLayer::new_for_http())
}

async fn proxy_handler<H: ForwardHandler, P: ExchangeProcessor>(
    State(pipeline): State<Arc<AnalysisPipeline<H, P>>>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    tracing::debug!(method = %method, uri = %request.uri(), "Proxying request");

    let response = pipeline.serve(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
