//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy, pipeline and coverage engine produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the request ID layer into recorded exchanges
//! - Metric updates are fire-and-forget; without an installed recorder they are no-ops

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
