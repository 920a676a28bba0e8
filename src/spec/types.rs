//! In-memory model of a loaded API description.

use std::collections::BTreeSet;
use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// Where a parameter is carried in an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Query,
    Path,
    Header,
    Body,
    Form,
}

impl ParamLocation {
    /// Parse the `in` field of a parameter object.
    ///
    /// `formData` (Swagger 2.0) maps to `Form`, `cookie` (OpenAPI 3.x) is
    /// carried in a header and maps to `Header`.
    pub fn from_spec(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "path" => Some(Self::Path),
            "header" | "cookie" => Some(Self::Header),
            "body" => Some(Self::Body),
            "formData" | "form" => Some(Self::Form),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Path => "path",
            Self::Header => "header",
            Self::Body => "body",
            Self::Form => "form",
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    /// Allowed values, empty when the parameter declares no enum.
    pub enum_values: Vec<serde_json::Value>,
}

/// A declared (method, path) operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSpec {
    pub method: Method,
    /// Path template as written in the document, without the base path.
    pub path: String,
    pub parameters: Vec<ParameterSpec>,
    pub status_codes: BTreeSet<u16>,
}

/// A loaded API description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiSpec {
    /// Normalized base path; `/` when the document declares none.
    pub base_path: String,
    pub operations: Vec<OperationSpec>,
}

impl ApiSpec {
    /// Route template for an operation path, base path included.
    pub fn route_template(&self, path: &str) -> String {
        join_base_path(&self.base_path, path)
    }
}

/// Normalize a declared base path: cleaned, leading slash, no trailing slash.
///
/// Empty, `.` and `/` all normalize to `/`.
pub fn normalize_base_path(raw: &str) -> String {
    crate::routing::clean_path(raw)
}

/// Join a base path and an operation path into a route template.
pub fn join_base_path(base_path: &str, path: &str) -> String {
    crate::routing::clean_path(&format!("{}/{}", base_path, path))
}
