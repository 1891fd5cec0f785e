//! Default transport.

use std::time::Duration;

use hyper::body::Body;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use super::connector::{TracedConnector, TracingResolver};
use super::tls::tls_connector;
use crate::config::TransportConfig;
use crate::error::Result;

/// Pooled hyper client whose connections report DNS and TLS phases.
pub type DefaultClient<B> = Client<TracedConnector, B>;

/// Build the default transport.
pub fn default_transport<B>(config: &TransportConfig) -> Result<DefaultClient<B>>
where
    B: Body + Send,
    B::Data: Send,
{
    let mut http = HttpConnector::new_with_resolver(TracingResolver::new());
    http.enforce_http(false);
    http.set_nodelay(config.nodelay);
    http.set_connect_timeout(config.connect_timeout_ms.map(Duration::from_millis));

    let connector = TracedConnector::new(http, tls_connector(config.ca_bundle.as_deref())?);

    let client = Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .build(connector);

    tracing::debug!(
        nodelay = config.nodelay,
        connect_timeout_ms = ?config.connect_timeout_ms,
        pool_max_idle_per_host = config.pool_max_idle_per_host,
        "Default transport created"
    );

    Ok(client)
}

