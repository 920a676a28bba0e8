//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the API description file and forward target are present
//! - Validate value ranges and socket addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("openapi.file is not set (OPENAPI_FILE)")]
    MissingSpecFile,

    #[error("openapi.file '{0}' does not exist")]
    SpecFileNotFound(String),

    #[error("forward.url is not set (FORWARD_URL)")]
    MissingForwardUrl,

    #[error("forward.url '{url}' is invalid: {reason}")]
    InvalidForwardUrl { url: String, reason: String },

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.openapi.file.is_empty() {
        errors.push(ValidationError::MissingSpecFile);
    } else if !Path::new(&config.openapi.file).is_file() {
        errors.push(ValidationError::SpecFileNotFound(config.openapi.file.clone()));
    }

    if config.forward.url.is_empty() {
        errors.push(ValidationError::MissingForwardUrl);
    } else if let Err(reason) = check_forward_url(&config.forward.url) {
        errors.push(ValidationError::InvalidForwardUrl {
            url: config.forward.url.clone(),
            reason,
        });
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if let Some(addr) = &config.report.bind_address {
        check_address(&mut errors, "report.bind_address", addr);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.analysis.queue_capacity == 0 {
        errors.push(ValidationError::Zero("analysis.queue_capacity"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_forward_url(raw: &str) -> Result<(), String> {
    let url = url::Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}', only http is forwarded", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.openapi.file = "Cargo.toml".to_string();
        config.forward.url = "http://127.0.0.1:3000".to_string();
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_defaults_are_missing_required_fields() {
        let errors = validate_config(&ProxyConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingSpecFile));
        assert!(errors.contains(&ValidationError::MissingForwardUrl));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.forward.url = "https://example.com".to_string();
        config.listener.bind_address = "nope".to_string();
        config.report.bind_address = Some("127.0.0.1".to_string());
        config.analysis.queue_capacity = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::InvalidForwardUrl { .. }));
        assert!(errors.contains(&ValidationError::Zero("analysis.queue_capacity")));
    }

    #[test]
    fn test_spec_file_must_exist() {
        let mut config = valid_config();
        config.openapi.file = "does-not-exist.yaml".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::SpecFileNotFound("does-not-exist.yaml".into())]);
    }
}
