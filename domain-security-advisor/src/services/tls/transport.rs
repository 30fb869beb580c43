//! Network side of the TLS probes.
//!
//! Uses rustls for fully async handshakes, both directly (port 443) and after
//! an SMTP `STARTTLS` upgrade (port 25).

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{ProbeError, ProbeResult};
use crate::types::TlsVersion;

use super::smtp::SmtpClient;

/// Whether the peer certificate chain must be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verification {
    Strict,
    /// Accept any certificate; only the negotiated version matters.
    Relaxed,
}

/// Performs single probe attempts. Each call opens a fresh connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dial `host:port` and complete a TLS handshake.
    async fn tls_handshake(
        &self,
        host: &str,
        port: u16,
        verification: Verification,
    ) -> ProbeResult<TlsVersion>;

    /// Dial `host:port`, speak SMTP up to `STARTTLS` and complete the handshake.
    async fn starttls_handshake(
        &self,
        host: &str,
        port: u16,
        verification: Verification,
    ) -> ProbeResult<TlsVersion>;
}

/// [`Transport`] over real TCP sockets, every stage bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct NetworkTransport {
    timeout: Duration,
}

impl NetworkTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn dial(&self, host: &str, port: u16) -> ProbeResult<TcpStream> {
        let start_time = Instant::now();
        trace!("[TLS] Resolving {host}:{port}...");

        let addrs: Vec<SocketAddr> =
            match timeout(self.timeout, tokio::net::lookup_host((host, port))).await {
                Ok(Ok(addrs)) => addrs.collect(),
                Ok(Err(e)) => {
                    warn!("[TLS] Lookup of {host} failed: {e}");
                    return Err(lookup_error(host, &e));
                }
                Err(_) => return Err(ProbeError::Timeout),
            };
        if addrs.is_empty() {
            return Err(ProbeError::NoSuchHost(host.to_string()));
        }

        match timeout(self.timeout, TcpStream::connect(&addrs[..])).await {
            Ok(Ok(stream)) => {
                trace!(
                    "[TLS] TCP connection to {host}:{port} succeeded, took {:?}",
                    start_time.elapsed()
                );
                Ok(stream)
            }
            Ok(Err(e)) => {
                warn!("[TLS] TCP connection to {host}:{port} failed: {e}");
                Err(ProbeError::Connect(format!("dial tcp {host}:{port}: {e}")))
            }
            Err(_) => {
                warn!(
                    "[TLS] TCP connection to {host}:{port} timed out ({}s)",
                    self.timeout.as_secs()
                );
                Err(ProbeError::Timeout)
            }
        }
    }
}

/// Only a definitive "name does not exist" answer counts as no such host;
/// resolver outages keep their detail.
fn lookup_error(host: &str, error: &io::Error) -> ProbeError {
    const NOT_FOUND_MARKERS: &[&str] = &[
        "name or service not known",
        "nodename nor servname provided",
        "no address associated with hostname",
        "no such host",
        "host not found",
    ];

    let message = error.to_string().to_ascii_lowercase();
    if error.kind() == io::ErrorKind::NotFound
        || NOT_FOUND_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    {
        ProbeError::NoSuchHost(host.to_string())
    } else {
        ProbeError::Connect(format!("lookup {host}: {error}"))
    }
}

#[cfg(feature = "rustls")]
mod handshake {
    use std::sync::Arc;

    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
    use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
    use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
    use tokio::io::{AsyncRead, AsyncWrite};
    use tokio_rustls::TlsConnector;

    use crate::error::{ProbeError, ProbeResult};
    use crate::types::TlsVersion;

    use super::Verification;

    /// Install the ring `CryptoProvider` unless one is already installed.
    fn ensure_crypto_provider() {
        // Err only means a provider is already installed.
        let _ = CryptoProvider::install_default(rustls::crypto::ring::default_provider());
    }

    /// Accepts any certificate chain while still checking handshake signatures.
    #[derive(Debug)]
    struct AcceptAnyCertificate(Arc<CryptoProvider>);

    impl ServerCertVerifier for AcceptAnyCertificate {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls12_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls13_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }

    fn connector(verification: Verification) -> TlsConnector {
        ensure_crypto_provider();

        let config = match verification {
            Verification::Strict => {
                let mut root_store = RootCertStore::empty();
                root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                ClientConfig::builder()
                    .with_root_certificates(root_store)
                    .with_no_client_auth()
            }
            Verification::Relaxed => ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(Arc::new(
                    rustls::crypto::ring::default_provider(),
                ))))
                .with_no_client_auth(),
        };

        TlsConnector::from(Arc::new(config))
    }

    /// Run the handshake over `stream` and report the negotiated version.
    pub(super) async fn negotiate<S>(
        host: &str,
        stream: S,
        verification: Verification,
    ) -> ProbeResult<TlsVersion>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| ProbeError::Handshake(format!("invalid server name {host:?}")))?;

        let tls_stream = connector(verification)
            .connect(server_name, stream)
            .await
            .map_err(|e| {
                let certificate_error = e
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<rustls::Error>())
                    .and_then(|inner| match inner {
                        rustls::Error::InvalidCertificate(reason) => Some(format!("{reason:?}")),
                        _ => None,
                    });
                match certificate_error {
                    Some(reason) => ProbeError::UntrustedCertificate(reason),
                    None => ProbeError::Handshake(format!("tls: {e}")),
                }
            })?;

        let (_, connection) = tls_stream.get_ref();
        Ok(connection
            .protocol_version()
            .map_or(TlsVersion::Unknown, TlsVersion::from))
    }
}

#[cfg(not(feature = "rustls"))]
mod handshake {
    use tokio::io::{AsyncRead, AsyncWrite};

    use crate::error::{ProbeError, ProbeResult};
    use crate::types::TlsVersion;

    use super::Verification;

    pub(super) async fn negotiate<S>(
        _host: &str,
        _stream: S,
        _verification: Verification,
    ) -> ProbeResult<TlsVersion>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Err(ProbeError::Handshake(
            "TLS probing is disabled, enable the rustls feature".to_string(),
        ))
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    async fn tls_handshake(
        &self,
        host: &str,
        port: u16,
        verification: Verification,
    ) -> ProbeResult<TlsVersion> {
        debug!("[TLS] Handshake with {host}:{port} ({verification:?})");
        let stream = self.dial(host, port).await?;

        let start_time = Instant::now();
        let version = timeout(
            self.timeout,
            handshake::negotiate(host, stream, verification),
        )
        .await
        .map_err(|_| ProbeError::Handshake("tls: handshake timed out".to_string()))??;

        debug!(
            "[TLS] {host}:{port} negotiated TLS {version}, took {:?}",
            start_time.elapsed()
        );
        Ok(version)
    }

    async fn starttls_handshake(
        &self,
        host: &str,
        port: u16,
        verification: Verification,
    ) -> ProbeResult<TlsVersion> {
        debug!("[SMTP] STARTTLS with {host}:{port} ({verification:?})");
        let stream = self.dial(host, port).await?;

        let client = timeout(self.timeout, SmtpClient::connect(stream))
            .await
            .map_err(|_| ProbeError::Smtp("timed out waiting for greeting".to_string()))??;

        let start_time = Instant::now();
        let version = timeout(self.timeout, async {
            let stream = client.start_tls().await?;
            handshake::negotiate(host, stream, verification).await
        })
        .await
        .map_err(|_| ProbeError::Handshake("STARTTLS timed out".to_string()))??;

        debug!(
            "[SMTP] {host}:{port} negotiated TLS {version}, took {:?}",
            start_time.elapsed()
        );
        Ok(version)
    }
}

/// Shared handle used by the advisor.
pub type SharedTransport = Arc<dyn Transport>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_dial_unresolvable_host() {
        let transport = NetworkTransport::new(Duration::from_secs(5));
        let result = transport
            .tls_handshake("nonexistent.invalid", 443, Verification::Strict)
            .await;
        // Sandboxes without a resolver report a lookup failure instead.
        match result {
            Err(ProbeError::NoSuchHost(host)) => assert_eq!(host, "nonexistent.invalid"),
            Err(ProbeError::Connect(message)) => {
                assert!(message.starts_with("lookup nonexistent.invalid: "), "{message}");
            }
            Err(ProbeError::Timeout) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_lookup_error_not_found() {
        for message in [
            "failed to lookup address information: Name or service not known",
            "failed to lookup address information: nodename nor servname provided, or not known",
            "failed to lookup address information: No address associated with hostname",
            "No such host is known. (os error 11001)",
        ] {
            let error = io::Error::other(message);
            assert_eq!(
                lookup_error("missing.example", &error),
                ProbeError::NoSuchHost("missing.example".to_string())
            );
        }
    }

    #[test]
    fn test_lookup_error_resolver_failure_keeps_detail() {
        let error = io::Error::other(
            "failed to lookup address information: Temporary failure in name resolution",
        );
        assert_eq!(
            lookup_error("example.com", &error),
            ProbeError::Connect(
                "lookup example.com: failed to lookup address information: Temporary failure in name resolution"
                    .to_string()
            )
        );

        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        assert!(matches!(
            lookup_error("example.com", &refused),
            ProbeError::Connect(_)
        ));
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = NetworkTransport::new(Duration::from_secs(5));
        let result = transport
            .tls_handshake("127.0.0.1", port, Verification::Strict)
            .await;
        assert!(matches!(result, Err(ProbeError::Connect(_))));
    }

    #[tokio::test]
    async fn test_starttls_rejected_greeting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"421 too busy\r\n").await.unwrap();
            socket
        });

        let transport = NetworkTransport::new(Duration::from_secs(5));
        let result = transport
            .starttls_handshake("127.0.0.1", port, Verification::Strict)
            .await;
        assert!(matches!(result, Err(ProbeError::Smtp(_))));
        drop(server.await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_tls_handshake_real() {
        let transport = NetworkTransport::new(Duration::from_secs(5));
        let version = transport
            .tls_handshake("google.com", 443, Verification::Strict)
            .await;
        match version {
            Ok(version) => assert_eq!(version, TlsVersion::Tls13),
            Err(e) => eprintln!("WARN: handshake with google.com failed: {e} (network issue?)"),
        }
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_untrusted_certificate_real() {
        let transport = NetworkTransport::new(Duration::from_secs(5));
        let strict = transport
            .tls_handshake("self-signed.badssl.com", 443, Verification::Strict)
            .await;
        if let Err(e) = &strict {
            assert!(e.is_certificate_failure(), "unexpected error: {e}");
        }
        let relaxed = transport
            .tls_handshake("self-signed.badssl.com", 443, Verification::Relaxed)
            .await;
        assert!(relaxed.is_ok() || matches!(relaxed, Err(ProbeError::Timeout)));
    }
}
