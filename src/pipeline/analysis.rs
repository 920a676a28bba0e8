//! Producer / single-consumer hand-off between serving tasks and coverage ingestion.
//!
//! # Responsibilities
//! - Serve every request exactly once through the duplicating writer
//! - Queue the recorded exchange after the client response is complete
//! - Run one dedicated ingestion thread, launched at most once
//!
//! # Design Decisions
//! - Bounded queue: a full queue blocks the serving task for at most
//!   `enqueue_timeout`, then the exchange is dropped and counted
//! - The worker is an OS thread using `blocking_recv`, so ingestion locks are
//!   never taken on an async worker
//! - Each serving task holds its own sender clone, so shutdown drains every
//!   exchange still in flight

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::config::AnalysisConfig;
use crate::http::client::client_channel;
use crate::http::duplicate::DuplicatingResponseWriter;
use crate::http::recorder::{RecordedExchange, RequestSnapshot, ResponseRecorder};
use crate::observability::metrics;
use crate::pipeline::{ExchangeProcessor, ForwardHandler};

/// Serves requests through a forwarding handler and feeds the recorded
/// exchanges to a processor on a background worker.
pub struct AnalysisPipeline<H, P> {
    handler: Arc<H>,
    processor: Arc<P>,
    capacity: usize,
    enqueue_timeout: Duration,
    body_limit: usize,
    sender: RwLock<Option<mpsc::Sender<RecordedExchange>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    launched: AtomicBool,
    enqueued: AtomicU64,
    dropped: AtomicU64,
}

impl<H: ForwardHandler, P: ExchangeProcessor> AnalysisPipeline<H, P> {
    pub fn new(handler: H, processor: Arc<P>, config: &AnalysisConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            processor,
            capacity: config.queue_capacity.max(1),
            enqueue_timeout: Duration::from_millis(config.enqueue_timeout_ms),
            body_limit: config.max_recorded_body_bytes,
            sender: RwLock::new(None),
            worker: Mutex::new(None),
            launched: AtomicBool::new(false),
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Start the ingestion worker.
    ///
    /// Returns `Ok(false)` when the worker was already launched; a second
    /// call never creates a competing consumer.
    pub fn launch(&self) -> std::io::Result<bool> {
        if self
            .launched
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Analysis pipeline already launched");
            return Ok(false);
        }

        let (tx, mut rx) = mpsc::channel::<RecordedExchange>(self.capacity);
        let processor = Arc::clone(&self.processor);
        let spawned = thread::Builder::new()
            .name("coverage-ingest".to_string())
            .spawn(move || {
                tracing::info!("Coverage ingestion worker started");
                while let Some(exchange) = rx.blocking_recv() {
                    processor.process(exchange);
                }
                tracing::info!("Coverage ingestion worker stopped");
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.launched.store(false, Ordering::Release);
                return Err(e);
            }
        };

        *self.sender.write().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        tracing::info!(
            queue_capacity = self.capacity,
            enqueue_timeout_ms = self.enqueue_timeout.as_millis() as u64,
            "Analysis pipeline launched"
        );
        Ok(true)
    }

    pub fn is_launched(&self) -> bool {
        self.launched.load(Ordering::Acquire)
    }

    /// Exchanges accepted by the queue so far.
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Exchanges dropped because the queue stayed full or was closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Serve one request.
    ///
    /// The forwarding handler runs on its own task writing through the
    /// duplicating writer; this future resolves as soon as the response head
    /// is available and the body streams from there.
    pub async fn serve(self: Arc<Self>, request: Request<Body>) -> Response {
        let snapshot = RequestSnapshot::capture(&request);
        let recorder = ResponseRecorder::with_body_limit(snapshot, self.body_limit);
        let (client, pending) = client_channel();
        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner).clone();

        let pipeline = Arc::clone(&self);
        tokio::spawn(async move {
            let mut writer = DuplicatingResponseWriter::new(client, recorder);
            pipeline.handler.serve(&mut writer, request).await;
            writer.finish();

            // Close the client body before queueing the exchange.
            let (client, recorder) = writer.into_inner();
            drop(client);
            pipeline.hand_off(sender, recorder.into_exchange()).await;
        });

        pending.into_response().await
    }

    async fn hand_off(
        &self,
        sender: Option<mpsc::Sender<RecordedExchange>>,
        exchange: RecordedExchange,
    ) {
        let Some(sender) = sender else {
            tracing::debug!(
                path = %exchange.request.path(),
                "Analysis pipeline not running, exchange discarded"
            );
            return;
        };

        match sender.send_timeout(exchange, self.enqueue_timeout).await {
            Ok(()) => {
                self.enqueued.fetch_add(1, Ordering::Relaxed);
                metrics::record_exchange_enqueued();
            }
            Err(SendTimeoutError::Timeout(exchange)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::record_exchange_dropped("queue_full");
                tracing::warn!(
                    method = %exchange.request.method,
                    path = %exchange.request.path(),
                    timeout_ms = self.enqueue_timeout.as_millis() as u64,
                    "Analysis queue full, exchange dropped"
                );
            }
            Err(SendTimeoutError::Closed(exchange)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::record_exchange_dropped("closed");
                tracing::debug!(path = %exchange.request.path(), "Analysis queue closed, exchange dropped");
            }
        }
    }

    /// Close the queue and wait up to `grace` for the worker to ingest what is left.
    pub async fn shutdown(&self, grace: Duration) {
        let sender = self.sender.write().unwrap_or_else(PoisonError::into_inner).take();
        drop(sender);

        let handle = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(handle) = handle else {
            return;
        };

        let join = tokio::task::spawn_blocking(move || handle.join());
        match tokio::time::timeout(grace, join).await {
            Ok(Ok(Ok(()))) => tracing::info!(
                enqueued = self.enqueued(),
                dropped = self.dropped(),
                "Analysis pipeline drained"
            ),
            Ok(Ok(Err(_))) => tracing::error!("Coverage ingestion worker panicked"),
            Ok(Err(e)) => tracing::error!(error = %e, "Failed to join coverage ingestion worker"),
            Err(_) => tracing::warn!(
                grace_ms = grace.as_millis() as u64,
                "Analysis pipeline did not drain before the deadline"
            ),
        }
    }
}
