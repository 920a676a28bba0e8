//! Route matching logic.
//!
//! # Responsibilities
//! - Collect (method, template) registrations before the build
//! - Rewrite OpenAPI placeholders (`/pets/{id}`) to tree captures (`/pets/:id`)
//! - Resolve a concrete path to its template and captured parameters
//!
//! # Design Decisions
//! - Method matching is case-insensitive (normalized to upper case)
//! - Path matching is case-sensitive
//! - Lookup before `build` behaves as a miss
//! - A placeholder captures exactly one path segment

use std::collections::HashMap;
use std::fmt;

use matchit::Router as MatchitRouter;
use thiserror::Error;

/// Errors raised while registering or compiling routes.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The template collides with one already registered for the method.
    #[error("route {method} {template} conflicts with an existing route: {source}")]
    Conflict {
        method: String,
        template: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("route matcher has already been built")]
    AlreadyBuilt,
}

/// A declared (method, OpenAPI path template) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteTemplate {
    pub method: String,
    pub template: String,
}

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    pub method: String,
    pub template: String,
    pub params: HashMap<String, String>,
}

impl fmt::Display for MatchedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({:?})", self.method, self.template, self.params)
    }
}

/// Maps concrete (method, path) pairs back to declared route templates.
#[derive(Default)]
pub struct RouteMatcher {
    records: HashMap<String, Vec<RouteTemplate>>,
    routers: Option<HashMap<String, MatchitRouter<String>>>,
}

impl fmt::Debug for RouteMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatcher")
            .field("records", &self.records)
            .field("built", &self.routers.is_some())
            .finish()
    }
}

impl RouteMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template for a method.
    ///
    /// Fails once the matcher has been built.
    pub fn add_route(&mut self, method: &str, template: &str) -> Result<(), RouteError> {
        if self.routers.is_some() {
            return Err(RouteError::AlreadyBuilt);
        }
        let method = method.to_ascii_uppercase();
        self.records.entry(method.clone()).or_default().push(RouteTemplate {
            method,
            template: template.to_string(),
        });
        Ok(())
    }

    /// Compile one prefix tree per method. Must be called exactly once.
    pub fn build(&mut self) -> Result<(), RouteError> {
        if self.routers.is_some() {
            return Err(RouteError::AlreadyBuilt);
        }

        let mut routers = HashMap::with_capacity(self.records.len());
        for (method, templates) in &self.records {
            let mut router = MatchitRouter::new();
            for route in templates {
                router
                    .insert(to_tree_pattern(&route.template), route.template.clone())
                    .map_err(|source| RouteError::Conflict {
                        method: method.clone(),
                        template: route.template.clone(),
                        source,
                    })?;
            }
            tracing::debug!(method = %method, routes = templates.len(), "Compiled route tree");
            routers.insert(method.clone(), router);
        }

        self.routers = Some(routers);
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.routers.is_some()
    }

    /// Number of registered templates across all methods.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a concrete path. `None` covers unknown methods, unmatched
    /// paths and an unbuilt matcher alike.
    pub fn lookup(&self, method: &str, path: &str) -> Option<MatchedRoute> {
        let Some(routers) = self.routers.as_ref() else {
            tracing::debug!(method = %method, path = %path, "Lookup on unbuilt route matcher");
            return None;
        };

        let method = method.to_ascii_uppercase();
        let matched = routers.get(&method)?.at(path).ok()?;
        let params = matched
            .params
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Some(MatchedRoute {
            method,
            template: matched.value.clone(),
            params,
        })
    }
}

/// Rewrite `{name}` placeholders into single-segment `:name` captures.
///
/// Text after the closing brace within the segment is dropped, so
/// `/files/{name}.json` becomes `/files/:name`.
fn to_tree_pattern(template: &str) -> String {
    template
        .split('/')
        .map(|segment| match (segment.find('{'), segment.find('}')) {
            (Some(open), Some(close)) if close > open + 1 => {
                format!("{}:{}", &segment[..open], &segment[open + 1..close])
            }
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
