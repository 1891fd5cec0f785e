//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the instrumented
//! client and its companion binary. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::metrics::CounterName;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Metric naming (namespace, subsystem, counter name).
    pub metrics: MetricsConfig,

    /// Default transport tuning.
    pub transport: TransportConfig,

    /// Requests issued by the `probe` command.
    pub probe: ProbeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Metric naming configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prefix for every metric name. Normalized before use.
    pub namespace: String,

    /// Second prefix segment. Normalized before use.
    pub subsystem: String,

    /// Which name the request counter is exported under.
    pub counter_name: CounterName,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "outbound".to_string(),
            subsystem: String::new(),
            counter_name: CounterName::Canonical,
        }
    }
}

/// Default transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Set TCP_NODELAY on outbound sockets.
    pub nodelay: bool,

    /// TCP connect timeout in milliseconds (none = OS default).
    pub connect_timeout_ms: Option<u64>,

    /// How long idle pooled connections are kept.
    pub pool_idle_timeout_secs: u64,

    /// Maximum idle pooled connections per host.
    pub pool_max_idle_per_host: usize,

    /// Extra PEM root certificates trusted in addition to the webpki roots.
    pub ca_bundle: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            nodelay: true,
            connect_timeout_ms: None,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 32,
            ca_bundle: None,
        }
    }
}

/// Probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Absolute URLs to request.
    pub targets: Vec<String>,

    /// HTTP method used for every probe request.
    pub method: String,

    /// How many times each target is requested.
    pub repeat: u32,

    /// Maximum probe requests in flight at once.
    pub concurrency: usize,

    /// Per-request timeout applied by the prober, not by the transport.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            method: "GET".to_string(),
            repeat: 1,
            concurrency: 4,
            timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
