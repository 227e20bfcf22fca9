//! TLS provider abstraction.
//!
//! The HTTP transport uses this trait so it never depends on a concrete
//! TLS library; the rustls implementation lives behind the `tls-rustls`
//! feature (on by default).

use std::io::{Read, Write};
use std::net::TcpStream;

use piterm_types::Result;

/// A bidirectional byte stream (plain or TLS-wrapped).
pub trait Stream: Read + Write {}

impl<T: Read + Write> Stream for T {}

/// Provides TLS client connections.
pub trait TlsProvider {
    /// Wrap `stream` in a TLS client session.
    ///
    /// `server_name` is used for SNI and certificate verification.
    fn connect(&self, stream: TcpStream, server_name: &str) -> Result<Box<dyn Stream>>;
}

#[cfg(feature = "tls-rustls")]
pub use rustls_provider::RustlsProvider;

#[cfg(feature = "tls-rustls")]
mod rustls_provider {
    use std::path::Path;
    use std::sync::Arc;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use rustls::ClientConfig;
    use rustls::pki_types::{CertificateDer, ServerName};

    use piterm_types::{PitermError, Result};

    use super::{Stream, TlsProvider};

    /// Shared, reusable TLS client configuration (one per process).
    #[derive(Debug)]
    pub struct RustlsProvider {
        config: Arc<ClientConfig>,
    }

    impl RustlsProvider {
        /// Build a provider trusting Mozilla's root bundle, plus any PEM
        /// certificates found at `extra_roots` (e.g. a corporate CA in
        /// front of the PI Web API).
        pub fn new(extra_roots: Option<&Path>) -> Result<Self> {
            let mut roots =
                rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            if let Some(path) = extra_roots {
                let certs = read_pem_certs(path)?;
                if certs.is_empty() {
                    return Err(PitermError::Config(format!(
                        "no certificates found in {}",
                        path.display()
                    )));
                }
                for cert in certs {
                    roots.add(cert).map_err(|e| {
                        PitermError::Config(format!("bad certificate in {}: {e}", path.display()))
                    })?;
                }
            }

            let config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();

            Ok(Self {
                config: Arc::new(config),
            })
        }
    }

    impl TlsProvider for RustlsProvider {
        fn connect(
            &self,
            stream: std::net::TcpStream,
            server_name: &str,
        ) -> Result<Box<dyn Stream>> {
            let sni = ServerName::try_from(server_name.to_owned())
                .map_err(|e| PitermError::WebApi(format!("invalid server name: {e}")))?;

            let conn = rustls::ClientConnection::new(Arc::clone(&self.config), sni)
                .map_err(|e| PitermError::WebApi(format!("TLS init: {e}")))?;

            Ok(Box::new(rustls::StreamOwned::new(conn, stream)))
        }
    }

    /// Extract DER certificates from the PEM blocks in a file.
    fn read_pem_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
        const BEGIN: &str = "-----BEGIN CERTIFICATE-----";
        const END: &str = "-----END CERTIFICATE-----";

        let contents = std::fs::read_to_string(path)?;
        let mut certs = Vec::new();
        let mut rest = contents.as_str();

        while let Some(start) = rest.find(BEGIN) {
            let after = &rest[start + BEGIN.len()..];
            let Some(end) = after.find(END) else {
                return Err(PitermError::Config(format!(
                    "unterminated certificate block in {}",
                    path.display()
                )));
            };
            let block: String = after[..end].split_whitespace().collect();
            let der = BASE64.decode(block).map_err(|e| {
                PitermError::Config(format!("bad certificate encoding in {}: {e}", path.display()))
            })?;
            certs.push(CertificateDer::from(der));
            rest = &after[end + END.len()..];
        }

        Ok(certs)
    }

}
