//! Startup error taxonomy.
//!
//! Everything here is fatal: the process exits before serving traffic.
//! Steady-state failures are logged where they happen and never reach this type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::http::ForwardError;
use crate::routing::RouteError;
use crate::spec::SpecError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot load API description: {0}")]
    Spec(#[from] SpecError),

    #[error("cannot build route table: {0}")]
    Route(#[from] RouteError),

    #[error("invalid forward target: {0}")]
    Forward(#[from] ForwardError),

    #[error("cannot start coverage worker: {0}")]
    Worker(#[source] std::io::Error),

    #[error("cannot bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}
