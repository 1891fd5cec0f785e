//! Total request latency.

use std::task::{Context, Poll};
use std::time::Instant;

use futures_util::future::BoxFuture;
use prometheus::Histogram;
use tower::{Layer, Service};

/// Layer producing [`RequestDuration`].
#[derive(Clone, Debug)]
pub struct RequestDurationLayer {
    histogram: Histogram,
}

impl RequestDurationLayer {
    pub fn new(histogram: Histogram) -> Self {
        Self { histogram }
    }
}

impl<S> Layer<S> for RequestDurationLayer {
    type Service = RequestDuration<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestDuration {
            inner,
            histogram: self.histogram.clone(),
        }
    }
}

/// Observes the seconds between `call` and completion, success or failure.
#[derive(Clone, Debug)]
pub struct RequestDuration<S> {
    inner: S,
    histogram: Histogram,
}

impl<S, Request> Service<Request> for RequestDuration<S>
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
        let start = Instant::now();
        let histogram = self.histogram.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let result = fut.await;
            histogram.observe(start.elapsed().as_secs_f64());
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::HistogramOpts;
    use std::time::Duration;
    use tower::{service_fn, ServiceExt};

    fn histogram() -> Histogram {
        Histogram::with_opts(HistogramOpts::new("duration_test", "test histogram")).unwrap()
    }

    #[tokio::test]
    async fn observes_once_per_call() {
        let histogram = histogram();
        let svc = RequestDurationLayer::new(histogram.clone()).layer(service_fn(|_: ()| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, std::convert::Infallible>(())
        }));

        let started = Instant::now();
        svc.oneshot(()).await.unwrap();
        let wall = started.elapsed().as_secs_f64();

        assert_eq!(histogram.get_sample_count(), 1);
        let observed = histogram.get_sample_sum();
        assert!(observed >= 0.02, "observed {observed}");
        assert!(observed <= wall, "observed {observed} > wall {wall}");
    }

    #[tokio::test]
    async fn failures_are_timed_too() {
        let histogram = histogram();
        let svc = RequestDurationLayer::new(histogram.clone())
            .layer(service_fn(|_: ()| async { Err::<(), _>("dns failure") }));

        assert_eq!(svc.oneshot(()).await.unwrap_err(), "dns failure");
        assert_eq!(histogram.get_sample_count(), 1);
    }
}
