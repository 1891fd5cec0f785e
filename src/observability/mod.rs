//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Library code emits tracing events:
//!     → instrument.rs (registration)
//!     → trace/ (phase events, TRACE level)
//!     → middleware/ (label failures, WARN level)
//!     → probe.rs (per-request outcomes)
//!
//! Binary installs:
//!     → logging.rs (fmt subscriber + env filter)
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber; only the binary does
//! - Metrics live in `crate::metrics`, exported through the caller's registry

pub mod logging;

pub use logging::init_logging;
