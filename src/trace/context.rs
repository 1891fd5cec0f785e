use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::futures::TaskLocalFuture;

use super::{ConnectionTrace, PhaseEvent};

tokio::task_local! {
    static CURRENT: TraceContext;
}

/// Hooks installed for one traced call, plus the instant the call started.
#[derive(Clone)]
pub struct TraceContext {
    hooks: Arc<dyn ConnectionTrace>,
    started: Instant,
}

impl TraceContext {
    pub fn new(hooks: Arc<dyn ConnectionTrace>) -> Self {
        Self {
            hooks,
            started: Instant::now(),
        }
    }

    /// Seconds since the traced call started.
    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Fire the hook for `event`.
    pub fn fire(&self, event: PhaseEvent) {
        let elapsed = self.elapsed();
        tracing::trace!(event = event.as_str(), elapsed, "Connection phase");
        match event {
            PhaseEvent::DnsStart => self.hooks.dns_start(elapsed),
            PhaseEvent::DnsDone => self.hooks.dns_done(elapsed),
            PhaseEvent::TlsHandshakeStart => self.hooks.tls_handshake_start(elapsed),
            PhaseEvent::TlsHandshakeDone => self.hooks.tls_handshake_done(elapsed),
        }
    }
}

impl fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceContext")
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

/// The trace context of the call currently executing on this task, if any.
///
/// Connection-establishment code calls this at the moment it starts a phase and
/// keeps the returned context for the matching `done` event.
pub fn current() -> Option<TraceContext> {
    CURRENT.try_with(Clone::clone).ok()
}

/// Run `fut` with `ctx` installed.
pub(crate) fn scope<F: Future>(ctx: TraceContext, fut: F) -> TaskLocalFuture<TraceContext, F> {
    CURRENT.scope(ctx, fut)
}

/// Run `f` synchronously with `ctx` installed.
pub(crate) fn sync_scope<R>(ctx: TraceContext, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(ctx, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(PhaseEvent, f64)>>);

    impl ConnectionTrace for Recorder {
        fn dns_start(&self, elapsed: f64) {
            self.0.lock().unwrap().push((PhaseEvent::DnsStart, elapsed));
        }

        fn tls_handshake_done(&self, elapsed: f64) {
            self.0.lock().unwrap().push((PhaseEvent::TlsHandshakeDone, elapsed));
        }
    }

    #[test]
    fn no_context_outside_scope() {
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn context_follows_the_future() {
        let recorder = Arc::new(Recorder::default());
        let ctx = TraceContext::new(recorder.clone());

        scope(ctx, async {
            tokio::task::yield_now().await;
            let ctx = current().expect("context installed");
            ctx.fire(PhaseEvent::DnsStart);
            ctx.fire(PhaseEvent::DnsDone);
            ctx.fire(PhaseEvent::TlsHandshakeDone);
        })
        .await;

        assert!(current().is_none());
        let events = recorder.0.lock().unwrap();
        // dns_done uses the default no-op hook
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, PhaseEvent::DnsStart);
        assert_eq!(events[1].0, PhaseEvent::TlsHandshakeDone);
        assert!(events[0].1 >= 0.0 && events[0].1 <= events[1].1);
    }

    #[test]
    fn sync_scope_installs_context() {
        let ctx = TraceContext::new(Arc::new(Recorder::default()));
        assert!(sync_scope(ctx, || current().is_some()));
        assert!(current().is_none());
    }
}
