//! Probe requests issued through an instrumented transport.
//!
//! # Responsibilities
//! - Turn configured targets into bodiless requests
//! - Issue them with bounded concurrency and a per-request timeout
//! - Report status and latency per request
//!
//! # Design Decisions
//! - The timeout wraps the transport call from outside; the transport itself has none
//! - Response bodies are drained so pooled connections can be reused

use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use http::header::USER_AGENT;
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use serde::Serialize;
use tower::ServiceExt;

use crate::config::validation::check_target;
use crate::config::ProbeConfig;
use crate::error::{BoxError, Error, Result};
use crate::transport::Transport;

/// Transport used for probes.
pub type ProbeTransport = Transport<Empty<Bytes>, Incoming>;

const PROBE_USER_AGENT: &str = concat!("outbound-metrics/", env!("CARGO_PKG_VERSION"));

/// Outcome of one probe request.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub method: String,
    /// Response status, absent when no response arrived.
    pub status: Option<u16>,
    pub elapsed_ms: f64,
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|s| (200..400).contains(&s))
    }
}

/// Parse a probe method.
pub fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.as_bytes())
        .map_err(|_| Error::Probe(format!("'{}' is not a valid HTTP method", method)))
}

/// Parse a probe target.
pub fn parse_target(target: &str) -> Result<Uri> {
    check_target(target).map_err(Error::Probe)
}

/// Issue a single request and wait for the full response.
pub async fn probe_once(
    transport: ProbeTransport,
    method: Method,
    uri: Uri,
    timeout: Duration,
) -> ProbeReport {
    let url = uri.to_string();
    let method_name = method.to_string();
    let started = Instant::now();

    let outcome = match Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_AGENT, PROBE_USER_AGENT)
        .body(Empty::new())
    {
        Ok(request) => tokio::time::timeout(timeout, async move {
            let response = transport.oneshot(request).await?;
            let status = response.status();
            response.into_body().collect().await?;
            Ok::<_, BoxError>(status)
        })
        .await
        .unwrap_or_else(|_| Err(format!("timed out after {:?}", timeout).into())),
        Err(e) => Err(e.into()),
    };

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match outcome {
        Ok(status) => {
            tracing::info!(url = %url, method = %method_name, status = status.as_u16(), elapsed_ms, "Probe completed");
            ProbeReport {
                url,
                method: method_name,
                status: Some(status.as_u16()),
                elapsed_ms,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(url = %url, method = %method_name, error = %e, elapsed_ms, "Probe failed");
            ProbeReport {
                url,
                method: method_name,
                status: None,
                elapsed_ms,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Run every configured probe, `repeat` times per target.
pub async fn run_probes(transport: ProbeTransport, config: &ProbeConfig) -> Result<Vec<ProbeReport>> {
    let method = parse_method(&config.method)?;
    let targets = config
        .targets
        .iter()
        .map(|t| parse_target(t))
        .collect::<Result<Vec<_>>>()?;
    let timeout = Duration::from_secs(config.timeout_secs);

    let jobs = targets
        .into_iter()
        .flat_map(|uri| std::iter::repeat(uri).take(config.repeat as usize));

    let reports = stream::iter(jobs)
        .map(|uri| probe_once(transport.clone(), method.clone(), uri, timeout))
        .buffer_unordered(config.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    Ok(reports)
}
