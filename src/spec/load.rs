//! Reading an API description from disk.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use axum::http::Method;
use serde_json::Value;
use thiserror::Error;

use super::types::{normalize_base_path, ApiSpec, OperationSpec, ParamLocation, ParameterSpec};

const METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Errors raised while loading an API description.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("cannot read spec file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported API description: {0}")]
    Unsupported(String),
}

/// Load and parse the API description at `path`.
///
/// `.yaml` / `.yml` files are parsed as YAML, everything else as JSON.
pub fn load_spec(path: &Path) -> Result<ApiSpec, SpecError> {
    let content = fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let spec = parse_spec(&content, yaml)?;

    tracing::info!(
        path = %path.display(),
        base_path = %spec.base_path,
        operations = spec.operations.len(),
        "API description loaded"
    );
    Ok(spec)
}

/// Parse an API description held in memory.
pub fn parse_spec(content: &str, yaml: bool) -> Result<ApiSpec, SpecError> {
    let doc: Value = if yaml {
        serde_yaml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };

    let base_path = if doc.get("swagger").is_some() {
        doc.get("basePath").and_then(Value::as_str).unwrap_or_default().to_string()
    } else if doc.get("openapi").is_some() {
        servers_base_path(&doc)
    } else {
        return Err(SpecError::Unsupported(
            "document has neither a `swagger` nor an `openapi` version field".to_string(),
        ));
    };

    let mut operations = Vec::new();
    if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            let shared = item.get("parameters").map(extract_parameters).unwrap_or_default();

            for (key, operation) in item {
                let verb = key.to_ascii_lowercase();
                if !METHODS.contains(&verb.as_str()) {
                    continue;
                }
                let Ok(method) = Method::from_bytes(verb.to_ascii_uppercase().as_bytes()) else {
                    continue;
                };
                let own = operation.get("parameters").map(extract_parameters).unwrap_or_default();

                operations.push(OperationSpec {
                    method,
                    path: path.clone(),
                    parameters: merge_parameters(&shared, own),
                    status_codes: extract_status_codes(operation),
                });
            }
        }
    }

    Ok(ApiSpec {
        base_path: normalize_base_path(&base_path),
        operations,
    })
}

/// Path component of the first `servers[].url`, absolute or relative.
fn servers_base_path(doc: &Value) -> String {
    let Some(server_url) = doc
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str)
    else {
        return String::new();
    };

    url::Url::parse(server_url)
        .or_else(|_| url::Url::parse(&format!("http://placeholder{}", server_url)))
        .map(|u| u.path().to_string())
        .unwrap_or_default()
}

fn extract_parameters(value: &Value) -> Vec<ParameterSpec> {
    let Some(list) = value.as_array() else {
        return Vec::new();
    };

    let mut params = Vec::with_capacity(list.len());
    for raw in list {
        if raw.get("$ref").is_some() {
            tracing::debug!(reference = ?raw.get("$ref"), "Skipping referenced parameter");
            continue;
        }
        let (Some(name), Some(location)) = (
            raw.get("name").and_then(Value::as_str),
            raw.get("in").and_then(Value::as_str).and_then(ParamLocation::from_spec),
        ) else {
            continue;
        };

        let enum_values = raw
            .get("enum")
            .or_else(|| raw.get("schema").and_then(|s| s.get("enum")))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        params.push(ParameterSpec {
            name: name.to_string(),
            location,
            required: location == ParamLocation::Path
                || raw.get("required").and_then(Value::as_bool).unwrap_or(false),
            enum_values,
        });
    }
    params
}

/// Operation-level parameters override path-level ones with the same location and name.
fn merge_parameters(shared: &[ParameterSpec], own: Vec<ParameterSpec>) -> Vec<ParameterSpec> {
    let mut merged: Vec<ParameterSpec> = shared
        .iter()
        .filter(|s| !own.iter().any(|o| o.location == s.location && o.name == s.name))
        .cloned()
        .collect();
    merged.extend(own);
    merged
}

/// Three digit response keys; `default` and range keys like `2XX` are skipped.
fn extract_status_codes(operation: &Value) -> BTreeSet<u16> {
    operation
        .get("responses")
        .and_then(Value::as_object)
        .map(|responses| {
            responses
                .keys()
                .filter(|k| k.len() == 3)
                .filter_map(|k| k.parse::<u16>().ok())
                .filter(|code| (100..600).contains(code))
                .collect()
        })
        .unwrap_or_default()
}
