//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (flags and OPENAPI_FILE / FORWARD_URL style env overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared to all subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the declared API surface cannot change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::CliArgs;
pub use loader::{read_config, ConfigError};
pub use schema::{
    AnalysisConfig, CoverageConfig, ForwardConfig, ListenerConfig, MinVariantsConfig,
    ObservabilityConfig, OpenApiConfig, ProxyConfig, ReportConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
