//! Per-operation parameter value tracking.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::MinVariantsConfig;
use crate::coverage::report::{ParamCoverage, ParamsCoverage};
use crate::http::recorder::RequestSnapshot;
use crate::spec::{ParamLocation, ParameterSpec};

/// Distinct values observed for one declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamValueState {
    covered_values: BTreeSet<String>,
    min_variants: usize,
    empty_allowed: bool,
}

impl ParamValueState {
    pub fn new(min_variants: usize, empty_allowed: bool) -> Self {
        Self {
            covered_values: BTreeSet::new(),
            min_variants,
            empty_allowed,
        }
    }

    /// Add a value. Returns `true` if it had not been seen before.
    pub fn record(&mut self, value: String) -> bool {
        self.covered_values.insert(value)
    }

    pub fn covered_values(&self) -> &BTreeSet<String> {
        &self.covered_values
    }

    pub fn min_variants(&self) -> usize {
        self.min_variants
    }

    /// Whether the parameter may be omitted.
    pub fn empty_allowed(&self) -> bool {
        self.empty_allowed
    }

    pub fn is_fully_covered(&self) -> bool {
        self.covered_values.len() >= self.min_variants
    }
}

/// Parameter coverage for one declared operation, keyed by location then name.
#[derive(Debug, Clone, Default)]
pub struct ParamCoverageTracker {
    by_location: BTreeMap<ParamLocation, BTreeMap<String, ParamValueState>>,
}

impl ParamCoverageTracker {
    /// Seed one state per declared parameter.
    ///
    /// The full coverage threshold is the size of the declared enum when
    /// there is one, otherwise the configured default for the location.
    pub fn new(parameters: &[ParameterSpec], defaults: &MinVariantsConfig) -> Self {
        let mut by_location: BTreeMap<ParamLocation, BTreeMap<String, ParamValueState>> =
            BTreeMap::new();

        for param in parameters {
            let min_variants = if param.enum_values.is_empty() {
                defaults.for_location(param.location)
            } else {
                param.enum_values.len()
            };
            by_location.entry(param.location).or_default().insert(
                param.name.clone(),
                ParamValueState::new(min_variants, !param.required),
            );
        }

        Self { by_location }
    }

    /// Record the values a request carries for declared parameters.
    pub fn record(&mut self, request: &RequestSnapshot) {
        for (location, states) in self.by_location.iter_mut() {
            match location {
                ParamLocation::Query => record_in_query(states, request),
                // Only query values are extracted; the other locations keep
                // their declared slots so reports list them uncovered.
                ParamLocation::Path
                | ParamLocation::Header
                | ParamLocation::Body
                | ParamLocation::Form => {}
            }
        }
    }

    pub fn state(&self, location: ParamLocation, name: &str) -> Option<&ParamValueState> {
        self.by_location.get(&location)?.get(name)
    }

    pub fn num_params(&self) -> usize {
        self.by_location.values().map(BTreeMap::len).sum()
    }

    pub fn report(&self) -> ParamsCoverage {
        let params = self
            .by_location
            .iter()
            .flat_map(|(location, states)| {
                states.iter().map(move |(name, state)| ParamCoverage {
                    name: name.clone(),
                    location: *location,
                    min_variants: state.min_variants,
                    fully_covered: state.is_fully_covered(),
                    covered_values: state.covered_values.iter().cloned().collect(),
                })
            })
            .collect();
        ParamsCoverage { params }
    }
}

fn record_in_query(states: &mut BTreeMap<String, ParamValueState>, request: &RequestSnapshot) {
    if states.is_empty() {
        return;
    }
    let Some(query) = request.query() else {
        return;
    };

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        grouped
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    for (key, values) in grouped {
        if let Some(state) = states.get_mut(&key) {
            state.record(canonical_value(values));
        }
    }
}

/// Multiple values for one key are sorted and joined with `,`.
fn canonical_value(mut values: Vec<String>) -> String {
    if values.len() == 1 {
        return values.pop().unwrap_or_default();
    }
    values.sort();
    values.join(",")
}
