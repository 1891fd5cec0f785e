//! In-flight request tracking.

use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use prometheus::IntGauge;
use tower::{Layer, Service};

/// Layer producing [`InFlight`].
#[derive(Clone, Debug)]
pub struct InFlightLayer {
    gauge: IntGauge,
}

impl InFlightLayer {
    pub fn new(gauge: IntGauge) -> Self {
        Self { gauge }
    }
}

impl<S> Layer<S> for InFlightLayer {
    type Service = InFlight<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InFlight {
            inner,
            gauge: self.gauge.clone(),
        }
    }
}

/// Keeps a gauge equal to the number of calls that entered but have not finished.
#[derive(Clone, Debug)]
pub struct InFlight<S> {
    inner: S,
    gauge: IntGauge,
}

impl<S, Request> Service<Request> for InFlight<S>
where
    S: Service<Request>,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let guard = InFlightGuard::enter(self.gauge.clone());
        let fut = self.inner.call(req);
        Box::pin(async move {
            let _guard = guard;
            fut.await
        })
    }
}

/// Guard that decrements the gauge when dropped.
///
/// Dropping covers completion, failure and cancellation of the call alike.
#[derive(Debug)]
struct InFlightGuard {
    gauge: IntGauge,
}

impl InFlightGuard {
    fn enter(gauge: IntGauge) -> Self {
        gauge.inc();
        Self { gauge }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
