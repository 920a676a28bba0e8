//! Coverage engine: the table of every declared endpoint.
//!
//! # Responsibilities
//! - Build one tracker per declared (template, method) and the route matcher
//! - Ingest recorded exchanges under an exclusive lock
//! - Produce deep-copied snapshots under a shared lock
//!
//! # Design Decisions
//! - Only the ingestion worker writes; report requests only read
//! - A poisoned lock is recovered: the table only grows, so a panic
//!   mid-update cannot leave it inconsistent
//! - Requests outside the declared surface are not an error

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use crate::config::MinVariantsConfig;
use crate::coverage::endpoint::{EndpointCoverageTracker, StatusOutcome};
use crate::coverage::report::CoverageSnapshot;
use crate::http::recorder::RecordedExchange;
use crate::observability::metrics;
use crate::pipeline::ExchangeProcessor;
use crate::routing::{clean_path, RouteError, RouteMatcher};
use crate::spec::ApiSpec;

/// Keyed by (route template, upper-case method).
type EndpointTable = HashMap<(String, String), EndpointCoverageTracker>;

/// Result of ingesting one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// No declared route matched; nothing was recorded.
    Unmatched,
    Documented(u16),
    Undocumented(u16),
    /// Matched, but the exchange carries no status.
    NoStatus,
}

pub struct CoverageEngine {
    matcher: RouteMatcher,
    endpoints: RwLock<EndpointTable>,
}

impl CoverageEngine {
    pub fn new(spec: &ApiSpec, defaults: &MinVariantsConfig) -> Result<Self, RouteError> {
        let mut matcher = RouteMatcher::new();
        let mut endpoints = EndpointTable::with_capacity(spec.operations.len());

        for operation in &spec.operations {
            let method = operation.method.as_str().to_ascii_uppercase();
            let template = spec.route_template(&operation.path);

            matcher.add_route(&method, &template)?;
            let tracker = EndpointCoverageTracker::new(&method, &template, operation, defaults);
            endpoints.insert((template, method), tracker);
        }
        matcher.build()?;

        tracing::info!(
            endpoints = endpoints.len(),
            base_path = %spec.base_path,
            "Coverage engine ready"
        );

        Ok(Self {
            matcher,
            endpoints: RwLock::new(endpoints),
        })
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn ingest(&self, exchange: &RecordedExchange) -> IngestOutcome {
        let request = &exchange.request;
        let path = clean_path(request.path());
        let request_id = request.request_id().unwrap_or("-");

        let Some(route) = self.matcher.lookup(request.method.as_str(), &path) else {
            tracing::debug!(
                request_id = %request_id,
                method = %request.method,
                path = %path,
                "No declared route"
            );
            metrics::record_exchange_ingested(false);
            return IngestOutcome::Unmatched;
        };

        let outcome = {
            let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
            let Some(tracker) = endpoints.get_mut(&(route.template.clone(), route.method.clone()))
            else {
                tracing::warn!(route = %route, "Matched route has no coverage tracker");
                return IngestOutcome::Unmatched;
            };

            tracker.record_params(request);
            match exchange.status.map(|s| s.as_u16()) {
                None => IngestOutcome::NoStatus,
                Some(status) => match tracker.record_status(status) {
                    StatusOutcome::Documented { first_seen } => {
                        if first_seen {
                            tracing::info!(route = %route, status, "Declared status code covered");
                        }
                        IngestOutcome::Documented(status)
                    }
                    StatusOutcome::Undocumented { first_seen } => {
                        if first_seen {
                            tracing::info!(
                                route = %route,
                                status,
                                "Undocumented status code observed"
                            );
                        }
                        IngestOutcome::Undocumented(status)
                    }
                },
            }
        };

        metrics::record_exchange_ingested(true);
        if matches!(outcome, IngestOutcome::Undocumented(_)) {
            metrics::record_undocumented_status();
        }
        tracing::debug!(
            request_id = %request_id,
            route = %route,
            path = %path,
            outcome = ?outcome,
            "Exchange ingested"
        );
        outcome
    }

    /// Deep copy of every endpoint, sorted by path then method.
    pub fn snapshot(&self) -> CoverageSnapshot {
        let mut endpoints: Vec<_> = {
            let table = self.endpoints.read().unwrap_or_else(PoisonError::into_inner);
            table.values().map(EndpointCoverageTracker::report).collect()
        };
        endpoints.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.cmp(&b.method)));
        CoverageSnapshot { endpoints }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        self.snapshot().to_json()
    }

    /// Write the current report to `path`, replacing any existing file.
    pub fn dump_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.snapshot().to_json_pretty().map_err(io::Error::other)?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Coverage report written");
        Ok(())
    }
}

impl ExchangeProcessor for CoverageEngine {
    fn process(&self, exchange: RecordedExchange) {
        self.ingest(&exchange);
    }
}
