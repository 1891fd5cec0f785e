//! Client metric definitions.
//!
//! # Responsibilities
//! - Declare the five client instruments and their fixed bucket layouts
//! - Normalize namespace/subsystem prefixes
//! - Register the whole set into a registry, all or nothing
//!
//! # Metrics
//! - `http_client_in_flight_requests` (gauge): requests entered but not yet finished
//! - `http_client_api_requests_total` (counter): completed exchanges by `code`, `method`
//! - `http_client_dns_duration_seconds` (histogram): DNS phase events by `event`
//! - `http_client_tls_duration_seconds` (histogram): TLS phase events by `event`
//! - `http_client_request_duration_seconds` (histogram): total call latency
//!
//! # Design Decisions
//! - Names, label keys and buckets are part of the export contract and never derived
//! - Handles are cloned into decorators; clones share the same underlying metric

mod set;

pub use set::ClientMetrics;

use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};

pub const IN_FLIGHT_REQUESTS: &str = "http_client_in_flight_requests";
pub const API_REQUESTS_TOTAL: &str = "http_client_api_requests_total";
pub const LEGACY_API_REQUESTS_TOTAL: &str = "client_api_requests_total";
pub const DNS_DURATION_SECONDS: &str = "http_client_dns_duration_seconds";
pub const TLS_DURATION_SECONDS: &str = "http_client_tls_duration_seconds";
pub const REQUEST_DURATION_SECONDS: &str = "http_client_request_duration_seconds";

pub const DNS_BUCKETS: [f64; 4] = [0.005, 0.01, 0.025, 0.05];
pub const TLS_BUCKETS: [f64; 4] = [0.05, 0.1, 0.25, 0.5];

/// Exported name of the request counter.
///
/// Older deployments exported the counter without the `http_` prefix. `Legacy`
/// exists only for dashboards that still query that name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterName {
    #[default]
    Canonical,
    Legacy,
}

impl CounterName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterName::Canonical => API_REQUESTS_TOTAL,
            CounterName::Legacy => LEGACY_API_REQUESTS_TOTAL,
        }
    }
}

/// Lower-case a prefix segment and replace hyphens with underscores.
pub fn normalize(s: &str) -> String {
    s.to_lowercase().replace('-', "_")
}

/// Render every metric in `registry` in the Prometheus text format.
pub fn encode_text(registry: &Registry) -> Result<String, prometheus::Error> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
