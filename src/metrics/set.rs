use prometheus::core::Collector;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

use super::{
    normalize, CounterName, DNS_BUCKETS, DNS_DURATION_SECONDS, IN_FLIGHT_REQUESTS,
    REQUEST_DURATION_SECONDS, TLS_BUCKETS, TLS_DURATION_SECONDS,
};

/// The five instruments shared by every decorator of one composition.
#[derive(Clone, Debug)]
pub struct ClientMetrics {
    /// Requests entered but not yet finished.
    pub in_flight: IntGauge,
    /// Completed exchanges by `code` and `method`.
    pub requests: IntCounterVec,
    /// DNS phase events by `event`.
    pub dns: HistogramVec,
    /// TLS phase events by `event`.
    pub tls: HistogramVec,
    /// Total call latency in seconds.
    pub duration: Histogram,
}

impl ClientMetrics {
    /// Build the instruments without registering them.
    pub fn new(
        namespace: &str,
        subsystem: &str,
        counter_name: CounterName,
    ) -> Result<Self, prometheus::Error> {
        let ns = normalize(namespace);
        let ss = normalize(subsystem);

        let in_flight = IntGauge::with_opts(
            Opts::new(
                IN_FLIGHT_REQUESTS,
                "Total count of in-flight requests for the wrapped http client.",
            )
            .namespace(ns.clone())
            .subsystem(ss.clone()),
        )?;

        let requests = IntCounterVec::new(
            Opts::new(
                counter_name.as_str(),
                "A counter for requests from the wrapped client.",
            )
            .namespace(ns.clone())
            .subsystem(ss.clone()),
            &["code", "method"],
        )?;

        let dns = HistogramVec::new(
            HistogramOpts::new(DNS_DURATION_SECONDS, "Trace dns latency histogram.")
                .namespace(ns.clone())
                .subsystem(ss.clone())
                .buckets(DNS_BUCKETS.to_vec()),
            &["event"],
        )?;

        let tls = HistogramVec::new(
            HistogramOpts::new(TLS_DURATION_SECONDS, "Trace tls latency histogram.")
                .namespace(ns.clone())
                .subsystem(ss.clone())
                .buckets(TLS_BUCKETS.to_vec()),
            &["event"],
        )?;

        let duration = Histogram::with_opts(
            HistogramOpts::new(
                REQUEST_DURATION_SECONDS,
                "Trace http request latencies histogram.",
            )
            .namespace(ns)
            .subsystem(ss)
            .buckets(prometheus::DEFAULT_BUCKETS.to_vec()),
        )?;

        Ok(Self {
            in_flight,
            requests,
            dns,
            tls,
            duration,
        })
    }

    fn collectors(&self) -> [Box<dyn Collector>; 5] {
        [
            Box::new(self.in_flight.clone()),
            Box::new(self.requests.clone()),
            Box::new(self.dns.clone()),
            Box::new(self.tls.clone()),
            Box::new(self.duration.clone()),
        ]
    }

    /// Register all five instruments.
    ///
    /// Either every instrument ends up registered or none does: on the first
    /// failure the instruments registered so far are removed again.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        let mut registered: Vec<Box<dyn Collector>> = Vec::with_capacity(5);

        for (collector, rollback) in self.collectors().into_iter().zip(self.collectors()) {
            if let Err(e) = registry.register(collector) {
                for done in registered.into_iter().rev() {
                    let _ = registry.unregister(done);
                }
                return Err(e);
            }
            registered.push(rollback);
        }

        Ok(())
    }
}
