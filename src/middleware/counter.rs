//! Completed request counting.

use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::{Request, Response};
use prometheus::IntCounterVec;
use tower::{Layer, Service};

/// Layer producing [`RequestCounter`].
#[derive(Clone, Debug)]
pub struct RequestCounterLayer {
    counter: IntCounterVec,
}

impl RequestCounterLayer {
    /// `counter` must be labeled `{code, method}`.
    pub fn new(counter: IntCounterVec) -> Self {
        Self { counter }
    }
}

impl<S> Layer<S> for RequestCounterLayer {
    type Service = RequestCounter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestCounter {
            inner,
            counter: self.counter.clone(),
        }
    }
}

/// Counts completed HTTP exchanges by status code and method.
///
/// Calls that fail without a response are not counted. The `method` label keeps
/// the request's casing (`GET`), unlike promhttp-based clients which export `get`.
#[derive(Clone, Debug)]
pub struct RequestCounter<S> {
    inner: S,
    counter: IntCounterVec,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestCounter<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().clone();
        let counter = self.counter.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let result = fut.await;
            if let Ok(response) = &result {
                let code = response.status().as_u16().to_string();
                match counter.get_metric_with_label_values(&[code.as_str(), method.as_str()]) {
                    Ok(c) => c.inc(),
                    Err(e) => tracing::warn!(
                        code = %code,
                        method = %method,
                        error = %e,
                        "Dropped request count"
                    ),
                }
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use prometheus::core::Collector;
    use prometheus::Opts;
    use tower::{service_fn, ServiceExt};

    fn counter() -> IntCounterVec {
        IntCounterVec::new(Opts::new("requests_test", "test counter"), &["code", "method"]).unwrap()
    }

    fn request(method: Method) -> Request<()> {
        Request::builder()
            .method(method)
            .uri("http://backend.local/")
            .body(())
            .unwrap()
    }

    #[tokio::test]
    async fn counts_by_status_and_method() {
        let counter = counter();
        let svc = RequestCounterLayer::new(counter.clone()).layer(service_fn(
            |req: Request<()>| async move {
                let status = if req.method() == Method::POST {
                    StatusCode::CREATED
                } else {
                    StatusCode::OK
                };
                Ok::<_, std::convert::Infallible>(
                    Response::builder().status(status).body(()).unwrap(),
                )
            },
        ));

        svc.clone().oneshot(request(Method::GET)).await.unwrap();
        svc.clone().oneshot(request(Method::GET)).await.unwrap();
        svc.oneshot(request(Method::POST)).await.unwrap();

        assert_eq!(counter.with_label_values(&["200", "GET"]).get(), 2);
        assert_eq!(counter.with_label_values(&["201", "POST"]).get(), 1);
        assert_eq!(counter.with_label_values(&["200", "POST"]).get(), 0);
        assert_eq!(counter.with_label_values(&["200", "get"]).get(), 0);
    }

    #[tokio::test]
    async fn error_status_is_still_a_completed_exchange() {
        let counter = counter();
        let svc = RequestCounterLayer::new(counter.clone()).layer(service_fn(|_: Request<()>| async {
            Ok::<_, std::convert::Infallible>(
                Response::builder()
                    .status(StatusCode::SERVICE_UNAVAILABLE)
                    .body(())
                    .unwrap(),
            )
        }));

        let res = svc.oneshot(request(Method::DELETE)).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(counter.with_label_values(&["503", "DELETE"]).get(), 1);
    }

    #[tokio::test]
    async fn failed_call_is_not_counted() {
        let counter = counter();
        let svc = RequestCounterLayer::new(counter.clone())
            .layer(service_fn(|_: Request<()>| async { Err::<Response<()>, _>("connection refused") }));

        let err = svc.oneshot(request(Method::GET)).await.unwrap_err();
        assert_eq!(err, "connection refused");
        assert!(counter.collect()[0].get_metric().is_empty());
    }
}
