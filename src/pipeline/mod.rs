//! Request analysis pipeline.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → analysis.rs (snapshot request, fresh ResponseRecorder)
//!     → DuplicatingResponseWriter(ClientSink, ResponseRecorder)
//!     → ForwardHandler::serve (client receives the response)
//!     → bounded queue (hand-off)
//!     → single ingestion worker → ExchangeProcessor::process
//! ```
//!
//! # Design Decisions
//! - The pipeline depends only on the two capability traits below
//! - Exactly one consumer; ingestion order is request completion order
//! - Coverage work never adds latency to the client response

pub mod analysis;

use std::future::Future;

use axum::body::Body;
use axum::http::Request;

use crate::http::recorder::RecordedExchange;
use crate::http::sink::ResponseSink;

pub use analysis::AnalysisPipeline;

/// Serves a request by writing a response into a sink.
pub trait ForwardHandler: Send + Sync + 'static {
    fn serve(
        &self,
        sink: &mut dyn ResponseSink,
        request: Request<Body>,
    ) -> impl Future<Output = ()> + Send;
}

/// Consumes completed exchanges on the ingestion worker.
pub trait ExchangeProcessor: Send + Sync + 'static {
    fn process(&self, exchange: RecordedExchange);
}
