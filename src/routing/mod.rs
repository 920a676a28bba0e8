//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     (method, OpenAPI template)[]
//!     → matcher.rs (rewrite `{name}` → `:name`)
//!     → one prefix tree per upper-cased method
//!     → Freeze as immutable RouteMatcher
//!
//! Recorded exchange (method, path)
//!     → clean_path (collapse `//`, `.`/`..`, trailing slash)
//!     → matcher.rs (per-method tree lookup)
//!     → Return: MatchedRoute { template, params } or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime (shared without locks)
//! - No regex in hot path (prefix tree only)
//! - A miss is a normal outcome, never an error
//! - Identical templates for the same method fail the build

pub mod matcher;

pub use matcher::{MatchedRoute, RouteError, RouteMatcher, RouteTemplate};

/// Clean a request or template path the way a file path is cleaned.
///
/// Empty segments and `.` are removed, `..` drops the previous segment, and
/// the result always starts with `/` and never ends with one (except `/`).
pub fn clean_path(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), "/");
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path("/pets/"), "/pets");
        assert_eq!(clean_path("//pets//42"), "/pets/42");
        assert_eq!(clean_path("/pets/./42/../7"), "/pets/7");
        assert_eq!(clean_path("/../.."), "/");
    }
}
