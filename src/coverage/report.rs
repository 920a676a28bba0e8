//! Serializable coverage report.

use serde::{Deserialize, Serialize};

use crate::spec::ParamLocation;

/// Point-in-time copy of the coverage state of every declared endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    pub endpoints: Vec<EndpointCoverage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointCoverage {
    pub method: String,
    pub path: String,
    /// Declared codes that have been observed, ascending.
    pub status_codes: Vec<u16>,
    /// Observed codes the description does not declare, ascending.
    pub undocumented_status_codes: Vec<u16>,
    #[serde(default)]
    pub declared_status_codes: Vec<u16>,
    pub params: ParamsCoverage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsCoverage {
    #[serde(default)]
    pub params: Vec<ParamCoverage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamCoverage {
    pub name: String,
    pub location: ParamLocation,
    pub min_variants: usize,
    pub fully_covered: bool,
    pub covered_values: Vec<String>,
}

impl CoverageSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn endpoint(&self, method: &str, path: &str) -> Option<&EndpointCoverage> {
        self.endpoints
            .iter()
            .find(|e| e.path == path && e.method.eq_ignore_ascii_case(method))
    }
}

impl EndpointCoverage {
    /// Declared status codes never observed.
    pub fn uncovered_status_codes(&self) -> Vec<u16> {
        self.declared_status_codes
            .iter()
            .copied()
            .filter(|code| !self.status_codes.contains(code))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let snapshot = CoverageSnapshot {
            endpoints: vec![EndpointCoverage {
                method: "GET".to_string(),
                path: "/pets".to_string(),
                status_codes: vec![200],
                undocumented_status_codes: vec![404],
                declared_status_codes: vec![200, 500],
                params: ParamsCoverage {
                    params: vec![ParamCoverage {
                        name: "limit".to_string(),
                        location: ParamLocation::Query,
                        min_variants: 2,
                        fully_covered: false,
                        covered_values: vec!["5".to_string()],
                    }],
                },
            }],
        };

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        let endpoint = &value["endpoints"][0];
        assert_eq!(endpoint["statusCodes"], serde_json::json!([200]));
        assert_eq!(endpoint["undocumentedStatusCodes"], serde_json::json!([404]));
        assert_eq!(endpoint["declaredStatusCodes"], serde_json::json!([200, 500]));
        let param = &endpoint["params"]["params"][0];
        assert_eq!(param["name"], "limit");
        assert_eq!(param["location"], "query");
        assert_eq!(param["minVariants"], 2);
        assert_eq!(param["fullyCovered"], false);
        assert_eq!(param["coveredValues"], serde_json::json!(["5"]));

        assert_eq!(snapshot.endpoints[0].uncovered_status_codes(), vec![500]);
        assert!(snapshot.endpoint("get", "/pets").is_some());
    }

    #[test]
    fn test_parses_minimal_document() {
        let doc = r#"{"endpoints": [{"method": "GET", "path": "/a", "statusCodes": [],
            "undocumentedStatusCodes": [], "params": {}}]}"#;
        let snapshot: CoverageSnapshot = serde_json::from_str(doc).unwrap();
        assert!(snapshot.endpoints[0].declared_status_codes.is_empty());
        assert!(snapshot.endpoints[0].params.params.is_empty());
    }
}
