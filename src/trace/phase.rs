use prometheus::HistogramVec;

use super::{ConnectionTrace, PhaseEvent};
use crate::metrics::ClientMetrics;

/// Records connection phase events into the DNS and TLS histograms.
#[derive(Clone, Debug)]
pub struct PhaseTracer {
    dns: HistogramVec,
    tls: HistogramVec,
}

impl PhaseTracer {
    pub fn new(metrics: &ClientMetrics) -> Self {
        Self {
            dns: metrics.dns.clone(),
            tls: metrics.tls.clone(),
        }
    }

    fn observe(histogram: &HistogramVec, event: PhaseEvent, elapsed: f64) {
        match histogram.get_metric_with_label_values(&[event.as_str()]) {
            Ok(h) => h.observe(elapsed),
            Err(e) => tracing::warn!(event = event.as_str(), error = %e, "Dropped phase observation"),
        }
    }
}

impl ConnectionTrace for PhaseTracer {
    fn dns_start(&self, elapsed: f64) {
        Self::observe(&self.dns, PhaseEvent::DnsStart, elapsed);
    }

    fn dns_done(&self, elapsed: f64) {
        Self::observe(&self.dns, PhaseEvent::DnsDone, elapsed);
    }

    fn tls_handshake_start(&self, elapsed: f64) {
        Self::observe(&self.tls, PhaseEvent::TlsHandshakeStart, elapsed);
    }

    fn tls_handshake_done(&self, elapsed: f64) {
        Self::observe(&self.tls, PhaseEvent::TlsHandshakeDone, elapsed);
    }
}
