//! TLS certificate inspection for HTTPS targets.
//!
//! Opens a raw TLS connection, reads the peer certificate, and reports
//! its validity window. The connection exists only to obtain the
//! certificate: the verifier accepts any chain, so the handshake
//! completes even when the certificate is expired and expiry can be
//! judged from the certificate itself.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::error;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::config::{TCP_CONNECT_TIMEOUT_SECS, TLS_HANDSHAKE_TIMEOUT_SECS};
use crate::models::SslInfo;

const SECONDS_PER_DAY: i64 = 86_400;

/// Accepts any presented certificate chain.
///
/// Signature checks still run so the handshake is a real one; only the
/// chain trust decision is skipped.
#[derive(Debug)]
struct InspectionVerifier(CryptoProvider);

impl ServerCertVerifier for InspectionVerifier {
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
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Retrieves the peer certificate's validity window and issuer.
///
/// # Arguments
///
/// * `host` - Hostname to connect to (e.g. "example.com")
/// * `port` - TLS port, normally 443
///
/// # Errors
///
/// Returns an error if:
/// - The hostname is not a valid server name
/// - TCP connect fails or exceeds its timeout
/// - The TLS handshake fails or exceeds its timeout
/// - The peer presents no certificate, or it cannot be parsed
pub async fn certificate_info(host: &str, port: u16) -> Result<SslInfo> {
    log::debug!("Inspecting certificate for {host}:{port}");

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InspectionVerifier(
            rustls::crypto::aws_lc_rs::default_provider(),
        )))
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .with_context(|| format!("Invalid server name: {host}"))?;

    let sock = match tokio::time::timeout(
        std::time::Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
        TcpStream::connect((host.to_string(), port)),
    )
    .await
    {
        Ok(Ok(sock)) => sock,
        Ok(Err(e)) => {
            error!("Failed to connect to {host}:{port} - {e}");
            return Err(anyhow::anyhow!("Failed to connect to {}:{}", host, port));
        }
        Err(_) => {
            error!("TCP connection timeout for {host}:{port}");
            return Err(anyhow::anyhow!(
                "TCP connection timeout for {}:{} ({}s)",
                host,
                port,
                TCP_CONNECT_TIMEOUT_SECS
            ));
        }
    };

    let connector = TlsConnector::from(Arc::new(config));
    let tls_stream = match tokio::time::timeout(
        std::time::Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
        connector.connect(server_name, sock),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            error!("TLS handshake failed for {host}: {e}");
            return Err(anyhow::anyhow!("TLS handshake failed for {}", host));
        }
        Err(_) => {
            error!("TLS handshake timeout for {host}");
            return Err(anyhow::anyhow!(
                "TLS handshake timeout for {} ({}s)",
                host,
                TLS_HANDSHAKE_TIMEOUT_SECS
            ));
        }
    };

    let certs = tls_stream
        .get_ref()
        .1
        .peer_certificates()
        .filter(|certs| !certs.is_empty())
        .ok_or_else(|| anyhow::anyhow!("No certificate presented by {}", host))?;

    let (_, cert) = x509_parser::parse_x509_certificate(certs[0].as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to parse certificate for {}: {}", host, e))?;

    let not_before = cert.validity().not_before.timestamp();
    let not_after = cert.validity().not_after.timestamp();
    let now = Utc::now().timestamp();

    // Floor division: a certificate half a day past expiry counts as -1
    let days_left = (not_after - now).div_euclid(SECONDS_PER_DAY);

    let issuer_name = cert.issuer();
    let issuer = issuer_name
        .iter_organization()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .or_else(|| {
            issuer_name
                .iter_common_name()
                .next()
                .and_then(|attr| attr.as_str().ok())
        })
        .unwrap_or("Unknown")
        .to_string();

    let valid_from = DateTime::<Utc>::from_timestamp(not_before, 0)
        .ok_or_else(|| anyhow::anyhow!("Certificate not_before out of range for {}", host))?;
    let valid_to = DateTime::<Utc>::from_timestamp(not_after, 0)
        .ok_or_else(|| anyhow::anyhow!("Certificate not_after out of range for {}", host))?;

    log::debug!("Certificate for {host}: issuer {issuer}, {days_left} days left");

    Ok(SslInfo {
        valid: now >= not_before && now <= not_after,
        days_left,
        issuer,
        valid_from,
        valid_to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_left_floor_division() {
        // 36 hours ahead is one full day left
        assert_eq!((36 * 3600i64).div_euclid(SECONDS_PER_DAY), 1);
        // Half a day past expiry already counts as expired
        assert_eq!((-12 * 3600i64).div_euclid(SECONDS_PER_DAY), -1);
        // Exactly now
        assert_eq!(0i64.div_euclid(SECONDS_PER_DAY), 0);
    }

    /// Network test; run with: cargo test --release -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_certificate_info_real_host() {
        crate::initialization::init_crypto_provider();
        let info = certificate_info("example.com", 443)
            .await
            .expect("certificate inspection failed");
        assert!(info.valid);
        assert!(info.days_left > 0);
        assert!(!info.issuer.is_empty());
        assert!(info.valid_from < info.valid_to);
    }
}
