//! TLS client configuration.
//!
//! # Design Decisions
//! - rustls with the ring provider; no process-wide provider is installed
//! - webpki roots always trusted, extra PEM roots appended from a CA bundle
//! - ALPN advertises only `http/1.1`

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::error::{Error, Result};

/// Build the root store: webpki roots plus every certificate in `ca_bundle`.
pub fn root_store(ca_bundle: Option<&Path>) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(path) = ca_bundle {
        let ca_error = |source| Error::CaBundle {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = BufReader::new(File::open(path).map_err(ca_error)?);
        let mut added = 0usize;
        for cert in rustls_pemfile::certs(&mut reader) {
            roots.add(cert.map_err(ca_error)?)?;
            added += 1;
        }
        tracing::debug!(path = %path.display(), added, "Loaded extra CA certificates");
    }

    Ok(roots)
}

/// Build the TLS connector used by the default transport.
pub fn tls_connector(ca_bundle: Option<&Path>) -> Result<TlsConnector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store(ca_bundle)?)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsConnector::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_store_has_webpki_roots() {
        let roots = root_store(None).unwrap();
        assert_eq!(roots.len(), webpki_roots::TLS_SERVER_ROOTS.len());
    }

    #[test]
    fn missing_bundle_is_reported() {
        let err = root_store(Some(Path::new("/no/such/bundle.pem"))).unwrap_err();
        assert!(matches!(err, Error::CaBundle { .. }));
    }

    #[test]
    fn connector_builds() {
        assert!(tls_connector(None).is_ok());
    }
}
