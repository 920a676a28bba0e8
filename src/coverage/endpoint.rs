//! Status code and parameter coverage for one declared operation.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::MinVariantsConfig;
use crate::coverage::params::ParamCoverageTracker;
use crate::coverage::report::EndpointCoverage;
use crate::http::recorder::RequestSnapshot;
use crate::spec::OperationSpec;

/// How an observed status code was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Documented { first_seen: bool },
    Undocumented { first_seen: bool },
}

#[derive(Debug, Clone)]
pub struct EndpointCoverageTracker {
    method: String,
    path: String,
    /// Declared codes, seeded unobserved.
    status_codes: BTreeMap<u16, bool>,
    undocumented: BTreeSet<u16>,
    params: ParamCoverageTracker,
}

impl EndpointCoverageTracker {
    pub fn new(
        method: &str,
        path: &str,
        operation: &OperationSpec,
        defaults: &MinVariantsConfig,
    ) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            status_codes: operation.status_codes.iter().map(|code| (*code, false)).collect(),
            undocumented: BTreeSet::new(),
            params: ParamCoverageTracker::new(&operation.parameters, defaults),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &ParamCoverageTracker {
        &self.params
    }

    pub fn record_status(&mut self, status: u16) -> StatusOutcome {
        match self.status_codes.get_mut(&status) {
            Some(observed) => {
                let first_seen = !*observed;
                *observed = true;
                StatusOutcome::Documented { first_seen }
            }
            None => StatusOutcome::Undocumented {
                first_seen: self.undocumented.insert(status),
            },
        }
    }

    pub fn record_params(&mut self, request: &RequestSnapshot) {
        self.params.record(request);
    }

    pub fn report(&self) -> EndpointCoverage {
        EndpointCoverage {
            method: self.method.clone(),
            path: self.path.clone(),
            status_codes: self
                .status_codes
                .iter()
                .filter(|(_, observed)| **observed)
                .map(|(code, _)| *code)
                .collect(),
            undocumented_status_codes: self.undocumented.iter().copied().collect(),
            declared_status_codes: self.status_codes.keys().copied().collect(),
            params: self.params.report(),
        }
    }
}
