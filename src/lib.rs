//! Traffic-duplicating reverse proxy that measures live API coverage.
//!
//! Every request is forwarded to the real backend exactly once. The response
//! is written to the client and, in parallel, into an in-memory recorder; the
//! recorded exchange is then analysed on a background worker against the
//! operations declared in a Swagger / OpenAPI document.
//!
//! ```text
//!     Client ──▶ http::server ──▶ pipeline ──▶ http::forward ──▶ Backend
//!                                   │   ▲            │
//!                                   │   └─ duplicate ┤
//!                                   │        ├─ client sink ──▶ Client
//!                                   │        └─ recorder
//!                                   ▼
//!                      bounded queue ──▶ coverage-ingest thread
//!                                           └─▶ coverage::CoverageEngine
//!                                                 ├─ routing::RouteMatcher
//!                                                 └─ report (JSON endpoint, file dump)
//! ```

// Core subsystems
pub mod config;
pub mod coverage;
pub mod http;
pub mod pipeline;
pub mod routing;
pub mod spec;

// Outer surfaces
pub mod report;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use coverage::{CoverageEngine, CoverageSnapshot};
pub use error::StartupError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::AnalysisPipeline;
