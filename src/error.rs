//! Library error types.
//!
//! # Design Decisions
//! - Only construction can fail; a composed transport never adds errors of its own
//! - Transport failures stay `BoxError` and pass through unchanged
//! - Registration errors keep the prometheus error so callers can match on it

use std::path::PathBuf;

use crate::config::ConfigError;

/// Boxed error produced by transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while composing an instrumented transport.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A metric could not be registered (duplicate identifier or invalid name).
    #[error("metric registration failed: {0}")]
    Registration(#[from] prometheus::Error),

    /// The TLS client configuration could not be built.
    #[error("invalid TLS configuration: {0}")]
    Tls(#[from] rustls::Error),

    /// An extra CA bundle could not be read.
    #[error("failed to read CA bundle {}: {source}", path.display())]
    CaBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A probe target or method could not be turned into a request.
    #[error("invalid probe request: {0}")]
    Probe(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// True when a collector with the same identity was already registered.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::Registration(prometheus::Error::AlreadyReg))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
