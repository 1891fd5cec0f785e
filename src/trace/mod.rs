//! Connection phase tracing.
//!
//! # Data Flow
//! ```text
//! PhaseTrace decorator
//!     → installs TraceContext (hooks + start instant) for the inner call
//!     → transport connects: resolver / TLS connector call trace::current()
//!     → TraceContext fires ConnectionTrace hooks with seconds since start
//!     → PhaseTracer observes into the DNS / TLS histograms
//! ```
//!
//! # Design Decisions
//! - Hooks are a capability object, the transport does not know what they record
//! - Context lives in a task-local so it follows the request future, not the thread
//! - Start and done are separate samples; consumers derive durations by subtraction
//! - Transports that never look up the context leave the phase histograms empty

mod context;
mod phase;

pub use context::{current, TraceContext};
pub use phase::PhaseTracer;

pub(crate) use context::{scope, sync_scope};

/// A connection sub-phase boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseEvent {
    DnsStart,
    DnsDone,
    TlsHandshakeStart,
    TlsHandshakeDone,
}

impl PhaseEvent {
    /// Value of the `event` label.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseEvent::DnsStart => "dns_start",
            PhaseEvent::DnsDone => "dns_done",
            PhaseEvent::TlsHandshakeStart => "tls_handshake_start",
            PhaseEvent::TlsHandshakeDone => "tls_handshake_done",
        }
    }
}

/// Callbacks fired by a transport while it establishes a connection.
///
/// Every hook receives the seconds elapsed since the traced call started.
/// All hooks default to doing nothing.
pub trait ConnectionTrace: Send + Sync + 'static {
    fn dns_start(&self, _elapsed: f64) {}

    fn dns_done(&self, _elapsed: f64) {}

    fn tls_handshake_start(&self, _elapsed: f64) {}

    fn tls_handshake_done(&self, _elapsed: f64) {}
}
