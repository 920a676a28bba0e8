//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::spec::ParamLocation;

/// Root configuration for the coverage proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The real backend every request is forwarded to.
    pub forward: ForwardConfig,

    /// The API description coverage is measured against.
    pub openapi: OpenApiConfig,

    /// Hand-off queue between serving tasks and the ingestion worker.
    pub analysis: AnalysisConfig,

    /// Parameter coverage thresholds.
    pub coverage: CoverageConfig,

    /// Report endpoint and shutdown dump.
    pub report: ReportConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:7777").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7777".to_string(),
        }
    }
}

/// Forwarding target.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ForwardConfig {
    /// Absolute `http://host:port` URL of the backend.
    pub url: String,
}

/// API description location.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OpenApiConfig {
    /// Path to a Swagger 2.0 / OpenAPI 3.x document (JSON or YAML).
    pub file: String,
}

/// Analysis pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum recorded exchanges waiting for ingestion.
    pub queue_capacity: usize,

    /// How long a serving task waits for queue space before dropping the exchange.
    pub enqueue_timeout_ms: u64,

    /// Response bytes kept per recorded exchange; the rest is not recorded.
    pub max_recorded_body_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 300,
            enqueue_timeout_ms: 1000,
            max_recorded_body_bytes: 1024 * 1024,
        }
    }
}

/// Coverage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CoverageConfig {
    /// Distinct values needed for a parameter without an enum to be fully covered.
    pub min_variants: MinVariantsConfig,
}

/// Full coverage threshold per parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MinVariantsConfig {
    pub query: usize,
    pub path: usize,
    pub header: usize,
    pub body: usize,
    pub form: usize,
}

impl MinVariantsConfig {
    /// Threshold for a parameter location.
    pub fn for_location(&self, location: ParamLocation) -> usize {
        match location {
            ParamLocation::Query => self.query,
            ParamLocation::Path => self.path,
            ParamLocation::Header => self.header,
            ParamLocation::Body => self.body,
            ParamLocation::Form => self.form,
        }
    }
}

impl Default for MinVariantsConfig {
    fn default() -> Self {
        Self {
            query: 2,
            path: 2,
            header: 2,
            body: 2,
            form: 0,
        }
    }
}

/// Reporting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReportConfig {
    /// Bind address for the JSON report endpoint; disabled when unset.
    pub bind_address: Option<String>,

    /// File the final report is written to at shutdown.
    pub output_file: Option<String>,
}

/// Timeout configuration for forwarding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream request timeout (until response headers) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
