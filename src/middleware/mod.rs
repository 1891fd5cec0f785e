//! Instrumenting decorators.
//!
//! # Data Flow
//! ```text
//! caller
//!     → RequestDuration  (times the whole call)
//!     → PhaseTrace       (installs DNS/TLS hooks)
//!     → RequestCounter   (counts completed exchanges)
//!     → InFlight         (tracks pending calls)
//!     → base transport
//! ```
//!
//! # Design Decisions
//! - Each decorator is a tower `Layer` + `Service` pair and observes exactly one facet
//! - Results and errors pass through unchanged; decorators never retry or rewrite
//! - Exit observations run on failure as well as success
//! - Metric writes that can fail are logged and skipped, never surfaced to the caller

pub mod counter;
pub mod duration;
pub mod in_flight;
pub mod trace;

pub use counter::{RequestCounter, RequestCounterLayer};
pub use duration::{RequestDuration, RequestDurationLayer};
pub use in_flight::{InFlight, InFlightLayer};
pub use trace::{PhaseTrace, PhaseTraceLayer};

/// Service produced by applying all four decorators in the fixed order.
pub type Instrumented<S> = RequestDuration<PhaseTrace<RequestCounter<InFlight<S>>>>;
