//! Prometheus instrumentation for outbound HTTP clients.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller
//!       │  Request<B>
//!       ▼
//!  ┌──────────────────┐  http_client_request_duration_seconds
//!  │ RequestDuration  │
//!  ├──────────────────┤  http_client_{dns,tls}_duration_seconds
//!  │ PhaseTrace       │  (task-local hooks read by the connector)
//!  ├──────────────────┤  http_client_api_requests_total{code,method}
//!  │ RequestCounter   │
//!  ├──────────────────┤  http_client_in_flight_requests
//!  │ InFlight         │
//!  ├──────────────────┤
//!  │ base transport   │  hyper-util Client<TracedConnector> by default
//!  └──────────────────┘
//! ```
//!
//! [`Instrumentor`] registers one metric set into a `prometheus::Registry` and
//! hands out the four decorators; [`create`] does both in one call.

pub mod config;
pub mod error;
pub mod instrument;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod probe;
pub mod trace;
pub mod transport;

pub use config::AppConfig;
pub use error::{BoxError, Error, Result};
pub use instrument::{create, create_default, Instrumentor};
pub use metrics::{ClientMetrics, CounterName};
pub use trace::ConnectionTrace;
pub use transport::{build, Decorator, Transport};
