//! Composition of the instrumented transport.
//!
//! # Data Flow
//! ```text
//! Instrumentor::new(registry, namespace, subsystem)
//!     → ClientMetrics::new (five instruments, normalized prefix)
//!     → ClientMetrics::register (all or nothing)
//! Instrumentor::default_middlewares(base)
//!     → InFlight → RequestCounter → PhaseTrace → RequestDuration
//! ```
//!
//! # Design Decisions
//! - The registry is always passed in; when absent a private one is created
//! - Registration happens once, up front; the `add_*` methods cannot fail
//! - All decorators of one instrumentor share the same metric handles

use std::sync::Arc;

use hyper::body::{Body, Incoming};
use prometheus::Registry;
use tower::Layer;

use crate::config::{MetricsConfig, TransportConfig};
use crate::error::{BoxError, Result};
use crate::metrics::{self, ClientMetrics, CounterName};
use crate::middleware::{
    InFlight, InFlightLayer, Instrumented, PhaseTrace, PhaseTraceLayer, RequestCounter,
    RequestCounterLayer, RequestDuration, RequestDurationLayer,
};
use crate::trace::PhaseTracer;
use crate::transport::{self, Decorator, Transport};

/// Owns one registered metric set and hands out decorators bound to it.
#[derive(Clone, Debug)]
pub struct Instrumentor {
    namespace: String,
    subsystem: String,
    registry: Registry,
    metrics: ClientMetrics,
}

impl Instrumentor {
    /// Register the client metrics under `namespace` / `subsystem`.
    ///
    /// Fails if any of the metrics is already registered, e.g. when composing
    /// twice into the same registry with the same prefix.
    pub fn new(registry: Option<Registry>, namespace: &str, subsystem: &str) -> Result<Self> {
        Self::with_counter_name(registry, namespace, subsystem, CounterName::Canonical)
    }

    /// Like [`Instrumentor::new`], choosing the exported request counter name.
    pub fn with_counter_name(
        registry: Option<Registry>,
        namespace: &str,
        subsystem: &str,
        counter_name: CounterName,
    ) -> Result<Self> {
        let registry = registry.unwrap_or_else(Registry::new);
        let metrics = ClientMetrics::new(namespace, subsystem, counter_name)?;
        metrics.register(&registry)?;

        let instrumentor = Self {
            namespace: metrics::normalize(namespace),
            subsystem: metrics::normalize(subsystem),
            registry,
            metrics,
        };

        tracing::debug!(
            namespace = %instrumentor.namespace,
            subsystem = %instrumentor.subsystem,
            counter = counter_name.as_str(),
            "Client metrics registered"
        );
        Ok(instrumentor)
    }

    pub fn from_config(registry: Option<Registry>, config: &MetricsConfig) -> Result<Self> {
        Self::with_counter_name(
            registry,
            &config.namespace,
            &config.subsystem,
            config.counter_name,
        )
    }

    /// Normalized namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Normalized subsystem.
    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    /// Render the registry in the Prometheus text format.
    pub fn encode(&self) -> std::result::Result<String, prometheus::Error> {
        metrics::encode_text(&self.registry)
    }

    pub fn in_flight_layer(&self) -> InFlightLayer {
        InFlightLayer::new(self.metrics.in_flight.clone())
    }

    pub fn counter_layer(&self) -> RequestCounterLayer {
        RequestCounterLayer::new(self.metrics.requests.clone())
    }

    pub fn trace_layer(&self) -> PhaseTraceLayer {
        PhaseTraceLayer::new(Arc::new(PhaseTracer::new(&self.metrics)))
    }

    pub fn duration_layer(&self) -> RequestDurationLayer {
        RequestDurationLayer::new(self.metrics.duration.clone())
    }

    pub fn add_in_flight<S>(&self, next: S) -> InFlight<S> {
        self.in_flight_layer().layer(next)
    }

    pub fn add_counter<S>(&self, next: S) -> RequestCounter<S> {
        self.counter_layer().layer(next)
    }

    pub fn add_trace<S>(&self, next: S) -> PhaseTrace<S> {
        self.trace_layer().layer(next)
    }

    pub fn add_duration<S>(&self, next: S) -> RequestDuration<S> {
        self.duration_layer().layer(next)
    }

    /// Wrap `base` in all four decorators, in-flight innermost and duration outermost.
    pub fn default_middlewares<S>(&self, base: S) -> Instrumented<S> {
        let chain = self.add_in_flight(base);
        let chain = self.add_counter(chain);
        let chain = self.add_trace(chain);
        self.add_duration(chain)
    }

    /// The four decorators as boxed `Transport -> Transport` transforms, in nesting order.
    pub fn decorators<ReqBody, ResBody>(&self) -> Vec<Decorator<ReqBody, ResBody>>
    where
        ReqBody: 'static,
        ResBody: Send + 'static,
    {
        vec![
            transport::decorator(self.in_flight_layer()),
            transport::decorator(self.counter_layer()),
            transport::decorator(self.trace_layer()),
            transport::decorator(self.duration_layer()),
        ]
    }

    /// Type-erased form of [`Instrumentor::default_middlewares`].
    pub fn instrument<ReqBody, ResBody>(
        &self,
        base: Transport<ReqBody, ResBody>,
    ) -> Transport<ReqBody, ResBody>
    where
        ReqBody: 'static,
        ResBody: Send + 'static,
    {
        transport::build(base, self.decorators())
    }
}

/// Compose an instrumented transport.
///
/// A missing `registry` becomes a private registry; a missing `base` becomes the
/// default traced transport.
pub fn create<B>(
    registry: Option<Registry>,
    base: Option<Transport<B, Incoming>>,
    namespace: &str,
    subsystem: &str,
) -> Result<Transport<B, Incoming>>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let base = match base {
        Some(base) => base,
        None => transport::boxed(transport::default_transport::<B>(&TransportConfig::default())?),
    };
    let instrumentor = Instrumentor::new(registry, namespace, subsystem)?;
    Ok(instrumentor.instrument(base))
}

/// [`create`] with the default transport.
pub fn create_default<B>(
    registry: Option<Registry>,
    namespace: &str,
    subsystem: &str,
) -> Result<Transport<B, Incoming>>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    create(registry, None, namespace, subsystem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Request, Response, StatusCode};
    use tower::{service_fn, ServiceExt};

    fn ok_transport() -> Transport<(), ()> {
        transport::boxed(service_fn(|_: Request<()>| async {
            Ok::<_, BoxError>(Response::builder().status(StatusCode::OK).body(()).unwrap())
        }))
    }

    #[test]
    fn same_prefix_twice_is_rejected() {
        let registry = Registry::new();
        Instrumentor::new(Some(registry.clone()), "api", "client").unwrap();
        let err = Instrumentor::new(Some(registry), "api", "client").unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn normalized_prefix_collides() {
        let registry = Registry::new();
        Instrumentor::new(Some(registry.clone()), "My-Api", "client").unwrap();
        let err = Instrumentor::new(Some(registry), "my_api", "Client").unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn different_subsystems_coexist() {
        let registry = Registry::new();
        let a = Instrumentor::new(Some(registry.clone()), "api", "billing").unwrap();
        let b = Instrumentor::new(Some(registry.clone()), "api", "search").unwrap();
        a.metrics().in_flight.inc();
        assert_eq!(b.metrics().in_flight.get(), 0);
        assert_eq!(registry.gather().len(), 4);
    }

    #[test]
    fn private_registry_by_default() {
        let a = Instrumentor::new(None, "api", "client").unwrap();
        let b = Instrumentor::new(None, "api", "client").unwrap();
        assert_eq!(a.namespace(), b.namespace());
    }

    #[tokio::test]
    async fn default_middlewares_share_one_metric_set() {
        let instrumentor = Instrumentor::new(None, "api", "client").unwrap();
        let svc = instrumentor.default_middlewares(ok_transport());

        svc.clone().oneshot(Request::new(())).await.unwrap();
        svc.oneshot(Request::new(())).await.unwrap();

        let metrics = instrumentor.metrics();
        assert_eq!(metrics.duration.get_sample_count(), 2);
        assert_eq!(metrics.requests.with_label_values(&["200", "GET"]).get(), 2);
        assert_eq!(metrics.in_flight.get(), 0);
    }

    #[tokio::test]
    async fn boxed_composition_matches_typed_one() {
        let instrumentor = Instrumentor::new(None, "api", "client").unwrap();
        let svc = instrumentor.instrument(ok_transport());

        svc.oneshot(Request::new(())).await.unwrap();

        let metrics = instrumentor.metrics();
        assert_eq!(metrics.duration.get_sample_count(), 1);
        assert_eq!(metrics.requests.with_label_values(&["200", "GET"]).get(), 1);
        assert_eq!(metrics.in_flight.get(), 0);
    }

    #[test]
    fn legacy_counter_name_is_opt_in() {
        let registry = Registry::new();
        let instrumentor =
            Instrumentor::with_counter_name(Some(registry), "api", "", CounterName::Legacy).unwrap();
        instrumentor.metrics().requests.with_label_values(&["200", "GET"]).inc();
        let text = instrumentor.encode().unwrap();
        assert!(text.contains("api_client_api_requests_total{code=\"200\",method=\"GET\"} 1"));
        assert!(!text.contains("http_client_api_requests_total"));
    }
}
