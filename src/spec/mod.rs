//! API description loading.
//!
//! # Data Flow
//! ```text
//! openapi.file (JSON or YAML)
//!     → load.rs (parse into serde_json::Value, detect Swagger 2.0 / OpenAPI 3.x)
//!     → ApiSpec { base_path, operations }
//!     → read once by CoverageEngine at startup
//! ```
//!
//! # Design Decisions
//! - The document is read as an untyped value so both Swagger 2.0 and
//!   OpenAPI 3.x share one extraction path
//! - Only what coverage needs is kept: parameters, enums, declared status codes
//! - `$ref` parameters and request bodies are not resolved

mod load;
mod types;

pub use load::{load_spec, parse_spec, SpecError};
pub use types::{join_base_path, normalize_base_path, ApiSpec, OperationSpec, ParamLocation, ParameterSpec};
