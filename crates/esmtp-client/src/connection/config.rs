//! Session configuration types.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::{Error, Result};

/// Default SMTP port.
pub const DEFAULT_PORT: u16 = 25;

/// Default port for SMTP over implicit TLS.
pub const DEFAULT_TLS_PORT: u16 = 465;

/// Client certificate chain and private key for TLS client authentication.
#[derive(Debug)]
pub struct ClientCertificate {
    /// Certificate chain, leaf first.
    pub chain: Vec<CertificateDer<'static>>,
    /// Private key for the leaf certificate.
    pub key: PrivateKeyDer<'static>,
}

impl ClientCertificate {
    /// Creates a client certificate from DER values.
    #[must_use]
    pub const fn new(chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Self {
        Self { chain, key }
    }

    /// Loads a certificate chain and private key from PEM files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either file cannot be read or
    /// contains no usable PEM data.
    pub fn from_pem_files(cert: impl AsRef<Path>, key: impl AsRef<Path>) -> Result<Self> {
        let pem_error = |e: rustls::pki_types::pem::Error| Error::Configuration(e.to_string());

        let chain = CertificateDer::pem_file_iter(cert.as_ref())
            .map_err(pem_error)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(pem_error)?;
        if chain.is_empty() {
            return Err(Error::Configuration(format!(
                "No certificates found in {}",
                cert.as_ref().display()
            )));
        }

        let key = PrivateKeyDer::from_pem_file(key.as_ref()).map_err(pem_error)?;
        Ok(Self { chain, key })
    }
}

impl Clone for ClientCertificate {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

/// SMTP session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server hostname (also the TLS server name).
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Name sent with EHLO/HELO.
    pub local_hostname: String,
    /// Per-operation timeout for writes, replies and handshakes.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Use TLS from the start (port 465).
    pub use_tls: bool,
    /// Verify the server certificate.
    pub validate_certs: bool,
    /// Client certificate for TLS client authentication.
    pub client_cert: Option<ClientCertificate>,
    /// Custom TLS configuration. Mutually exclusive with `client_cert`.
    pub tls_config: Option<Arc<ClientConfig>>,
}

impl SessionConfig {
    /// Creates a new plaintext configuration on port 25.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder::new(host)
    }
}

/// Builder for session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    host: String,
    port: Option<u16>,
    local_hostname: String,
    timeout: Duration,
    connect_timeout: Duration,
    use_tls: bool,
    validate_certs: bool,
    client_cert: Option<ClientCertificate>,
    tls_config: Option<Arc<ClientConfig>>,
}

impl SessionConfigBuilder {
    /// Creates a new builder with the given server hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            local_hostname: "localhost".to_string(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            use_tls: false,
            validate_certs: true,
            client_cert: None,
            tls_config: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the name sent with EHLO/HELO.
    #[must_use]
    pub fn local_hostname(mut self, name: impl Into<String>) -> Self {
        self.local_hostname = name.into();
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enables TLS from the start of the connection.
    #[must_use]
    pub const fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Enables or disables server certificate verification.
    #[must_use]
    pub const fn validate_certs(mut self, validate: bool) -> Self {
        self.validate_certs = validate;
        self
    }

    /// Sets the client certificate.
    #[must_use]
    pub fn client_cert(mut self, cert: ClientCertificate) -> Self {
        self.client_cert = Some(cert);
        self
    }

    /// Sets a custom TLS configuration.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        let default_port = if self.use_tls {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        };

        SessionConfig {
            host: self.host,
            port: self.port.unwrap_or(default_port),
            local_hostname: self.local_hostname,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            use_tls: self.use_tls,
            validate_certs: self.validate_certs,
            client_cert: self.client_cert,
            tls_config: self.tls_config,
        }
    }
}

/// Per-call overrides for STARTTLS.
///
/// Every field left as `None` falls back to the [`SessionConfig`] value.
#[derive(Debug, Clone, Default)]
pub struct StartTlsOptions {
    /// TLS server name; defaults to `SessionConfig::host`.
    pub server_hostname: Option<String>,
    /// Verify the server certificate.
    pub validate_certs: Option<bool>,
    /// Client certificate for TLS client authentication.
    pub client_cert: Option<ClientCertificate>,
    /// Custom TLS configuration.
    pub tls_config: Option<Arc<ClientConfig>>,
    /// Timeout for the STARTTLS exchange and the handshake.
    pub timeout: Option<Duration>,
}

impl StartTlsOptions {
    /// Creates options that use the session defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TLS server name.
    #[must_use]
    pub fn server_hostname(mut self, name: impl Into<String>) -> Self {
        self.server_hostname = Some(name.into());
        self
    }

    /// Enables or disables server certificate verification.
    #[must_use]
    pub const fn validate_certs(mut self, validate: bool) -> Self {
        self.validate_certs = Some(validate);
        self
    }

    /// Sets the client certificate.
    #[must_use]
    pub fn client_cert(mut self, cert: ClientCertificate) -> Self {
        self.client_cert = Some(cert);
        self
    }

    /// Sets a custom TLS configuration.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = SessionConfig::new("smtp.example.com");
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 25);
        assert_eq!(config.local_hostname, "localhost");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(!config.use_tls);
        assert!(config.validate_certs);
        assert!(config.client_cert.is_none());
        assert!(config.tls_config.is_none());
    }

    #[test]
    fn test_builder_tls_port() {
        let config = SessionConfig::builder("smtp.example.com")
            .use_tls(true)
            .build();
        assert_eq!(config.port, 465);
    }

    #[test]
    fn test_builder_overrides() {
        let config = SessionConfig::builder("smtp.example.com")
            .port(587)
            .local_hostname("client.example.com")
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .validate_certs(false)
            .build();

        assert_eq!(config.port, 587);
        assert_eq!(config.local_hostname, "client.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert!(!config.validate_certs);
    }

    #[test]
    fn test_starttls_options_default_to_session() {
        let options = StartTlsOptions::new();
        assert!(options.server_hostname.is_none());
        assert!(options.validate_certs.is_none());
        assert!(options.timeout.is_none());

        let options = options
            .server_hostname("mx.example.com")
            .timeout(Duration::from_secs(3));
        assert_eq!(options.server_hostname.as_deref(), Some("mx.example.com"));
        assert_eq!(options.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_missing_pem_files() {
        let result = ClientCertificate::from_pem_files("/nonexistent/cert.pem", "/nonexistent/key.pem");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
