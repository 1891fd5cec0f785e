//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that metric prefixes normalize to valid identifier segments
//! - Validate probe targets, method and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use http::{Method, Uri};

use crate::config::schema::AppConfig;
use crate::metrics::normalize;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_prefix("metrics.namespace", &config.metrics.namespace, &mut errors);
    check_prefix("metrics.subsystem", &config.metrics.subsystem, &mut errors);

    for (i, target) in config.probe.targets.iter().enumerate() {
        if let Err(message) = check_target(target) {
            errors.push(ValidationError::new(format!("probe.targets[{}]", i), message));
        }
    }

    if Method::from_bytes(config.probe.method.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "probe.method",
            format!("'{}' is not a valid HTTP method", config.probe.method),
        ));
    }
    if config.probe.concurrency == 0 {
        errors.push(ValidationError::new("probe.concurrency", "must be greater than 0"));
    }
    if config.probe.repeat == 0 {
        errors.push(ValidationError::new("probe.repeat", "must be greater than 0"));
    }
    if config.probe.timeout_secs == 0 {
        errors.push(ValidationError::new("probe.timeout_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_prefix(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    let normalized = normalize(value);
    let valid = normalized
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !normalized.starts_with(|c: char| c.is_ascii_digit());
    if !valid {
        errors.push(ValidationError::new(
            field,
            format!("'{}' does not normalize to a metric name segment", value),
        ));
    }
}

/// Check that a probe target is an absolute http(s) URL.
pub(crate) fn check_target(target: &str) -> Result<Uri, String> {
    let uri: Uri = target
        .parse()
        .map_err(|e| format!("'{}' is not a valid URI: {}", target, e))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => return Err(format!("'{}' must use http or https", target)),
    }
    if uri.host().is_none() {
        return Err(format!("'{}' has no host", target));
    }
    Ok(uri)
}
