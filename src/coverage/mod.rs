//! Coverage tracking subsystem.
//!
//! # Data Flow
//! ```text
//! RecordedExchange (from the ingestion worker)
//!     → engine.rs   (clean path, RouteMatcher lookup, exclusive lock)
//!     → endpoint.rs (declared / undocumented status codes)
//!     → params.rs   (distinct values per declared parameter)
//!
//! Report request
//!     → engine.rs (shared lock, deep copy)
//!     → report.rs (serializable CoverageSnapshot)
//! ```
//!
//! # Design Decisions
//! - The set of endpoints is fixed when the engine is built
//! - Covered values and undocumented codes only ever grow
//! - Snapshots never alias the live table

mod endpoint;
mod engine;
mod params;
mod report;

pub use endpoint::{EndpointCoverageTracker, StatusOutcome};
pub use engine::{CoverageEngine, IngestOutcome};
pub use params::{ParamCoverageTracker, ParamValueState};
pub use report::{CoverageSnapshot, EndpointCoverage, ParamCoverage, ParamsCoverage};
