//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → pipeline (snapshot + duplicating writer)
//!     → forward.rs (upstream request, streamed response)
//!     → duplicate.rs
//!         ├─ client.rs   (primary: the real client)
//!         └─ recorder.rs (secondary: in-memory copy for analysis)
//! ```

pub mod client;
pub mod duplicate;
pub mod forward;
pub mod recorder;
pub mod request;
pub mod server;
pub mod sink;

pub use client::{client_channel, ClientSink, PendingResponse};
pub use duplicate::DuplicatingResponseWriter;
pub use forward::{ForwardError, HttpForwarder};
pub use recorder::{RecordedExchange, RequestSnapshot, ResponseRecorder};
pub use request::X_REQUEST_ID;
pub use server::{proxy_router, HttpServer};
pub use sink::{ready, ResponseSink, SinkError};
