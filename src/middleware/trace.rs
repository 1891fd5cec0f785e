//! Connection phase hook installation.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::trace::{self, ConnectionTrace, TraceContext};

/// Layer producing [`PhaseTrace`].
#[derive(Clone)]
pub struct PhaseTraceLayer {
    hooks: Arc<dyn ConnectionTrace>,
}

impl PhaseTraceLayer {
    pub fn new(hooks: Arc<dyn ConnectionTrace>) -> Self {
        Self { hooks }
    }
}

impl<S> Layer<S> for PhaseTraceLayer {
    type Service = PhaseTrace<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PhaseTrace {
            inner,
            hooks: self.hooks.clone(),
        }
    }
}

/// Installs connection phase hooks for the duration of the inner call.
///
/// Records nothing itself; the transport fires the hooks while connecting.
#[derive(Clone)]
pub struct PhaseTrace<S> {
    inner: S,
    hooks: Arc<dyn ConnectionTrace>,
}

impl<S, Request> Service<Request> for PhaseTrace<S>
where
    S: Service<Request>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let ctx = TraceContext::new(self.hooks.clone());
        let inner = &mut self.inner;
        let fut = trace::sync_scope(ctx.clone(), move || inner.call(req));
        Box::pin(trace::scope(ctx, fut))
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for PhaseTrace<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseTrace")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::PhaseEvent;
    use std::sync::Mutex;
    use tower::{service_fn, ServiceExt};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<&'static str>>);

    impl ConnectionTrace for Recorder {
        fn dns_start(&self, _: f64) {
            self.0.lock().unwrap().push("dns_start");
        }
        fn dns_done(&self, _: f64) {
            self.0.lock().unwrap().push("dns_done");
        }
        fn tls_handshake_start(&self, _: f64) {
            self.0.lock().unwrap().push("tls_handshake_start");
        }
        fn tls_handshake_done(&self, _: f64) {
            self.0.lock().unwrap().push("tls_handshake_done");
        }
    }

    #[tokio::test]
    async fn hooks_reach_the_transport() {
        let recorder = Arc::new(Recorder::default());
        let transport = service_fn(|_: ()| async {
            let ctx = trace::current().expect("hooks installed");
            ctx.fire(PhaseEvent::DnsStart);
            tokio::task::yield_now().await;
            ctx.fire(PhaseEvent::DnsDone);
            ctx.fire(PhaseEvent::TlsHandshakeStart);
            ctx.fire(PhaseEvent::TlsHandshakeDone);
            Ok::<_, std::convert::Infallible>(())
        });

        PhaseTraceLayer::new(recorder.clone())
            .layer(transport)
            .oneshot(())
            .await
            .unwrap();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["dns_start", "dns_done", "tls_handshake_start", "tls_handshake_done"]
        );
    }

    #[tokio::test]
    async fn context_visible_during_call() {
        let recorder = Arc::new(Recorder::default());
        let transport = service_fn(|_: ()| {
            let seen = trace::current().is_some();
            async move { Ok::<_, std::convert::Infallible>(seen) }
        });

        let seen = PhaseTraceLayer::new(recorder)
            .layer(transport)
            .oneshot(())
            .await
            .unwrap();
        assert!(seen);
    }

    #[tokio::test]
    async fn plain_transport_fires_nothing() {
        let recorder = Arc::new(Recorder::default());
        PhaseTraceLayer::new(recorder.clone())
            .layer(service_fn(|_: ()| async { Ok::<_, std::convert::Infallible>(()) }))
            .oneshot(())
            .await
            .unwrap();
        assert!(recorder.0.lock().unwrap().is_empty());
    }
}
