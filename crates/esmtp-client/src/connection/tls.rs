//! TLS client configuration.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use super::config::ClientCertificate;
use crate::error::{Error, Result};

/// Resolves the TLS configuration for a connection.
///
/// A custom `tls_config` is used as-is. Otherwise a configuration is built
/// from the webpki root store, with client authentication when `client_cert`
/// is set and without server verification when `validate_certs` is false.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if both `tls_config` and `client_cert`
/// are given, or if the client certificate is unusable.
pub fn client_config(
    tls_config: Option<Arc<ClientConfig>>,
    client_cert: Option<&ClientCertificate>,
    validate_certs: bool,
) -> Result<Arc<ClientConfig>> {
    if tls_config.is_some() && client_cert.is_some() {
        return Err(Error::Configuration(
            "Either a TLS config or a client certificate/key may be provided, not both".into(),
        ));
    }

    if let Some(config) = tls_config {
        return Ok(config);
    }

    let builder = if validate_certs {
        let root_store = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        ClientConfig::builder().with_root_certificates(root_store)
    } else {
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoCertificateVerification::new()))
    };

    let config = match client_cert {
        Some(cert) => builder
            .with_client_auth_cert(cert.chain.clone(), cert.key.clone_key())
            .map_err(|e| Error::Configuration(format!("Invalid client certificate: {e}")))?,
        None => builder.with_no_client_auth(),
    };

    Ok(Arc::new(config))
}

/// Accepts any server certificate. Signatures are still checked so the
/// handshake itself stays well-formed.
#[derive(Debug)]
struct NoCertificateVerification(Arc<CryptoProvider>);

impl NoCertificateVerification {
    fn new() -> Self {
        let provider = CryptoProvider::get_default().cloned().unwrap_or_else(|| {
            Arc::new(rustls::crypto::aws_lc_rs::default_provider())
        });
        Self(provider)
    }
}

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
