//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
///
/// Every variant that originates from a server reply carries the raw status
/// code and message so callers can decide how to react.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Conflicting or unusable client configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Server rejected HELO or EHLO.
    #[error("HELO/EHLO rejected {code}: {message}")]
    Helo {
        /// Reply code (e.g., 502).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Server returned an unexpected reply.
    #[error("SMTP error {code}: {message}")]
    Response {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Server refused the envelope sender.
    #[error("Sender <{sender}> refused {code}: {message}")]
    SenderRefused {
        /// Reply code.
        code: u16,
        /// Error message from server.
        message: String,
        /// The sender that was refused.
        sender: String,
    },

    /// Server refused a recipient.
    #[error("Recipient <{recipient}> refused {code}: {message}")]
    RecipientRefused {
        /// Reply code.
        code: u16,
        /// Error message from server.
        message: String,
        /// The recipient that was refused.
        recipient: String,
    },

    /// Every recipient of a message was refused.
    #[error("All {} recipients refused", .0.len())]
    RecipientsRefused(Vec<Error>),

    /// Server rejected the DATA command or the message content.
    #[error("DATA rejected {code}: {message}")]
    Data {
        /// Reply code.
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Connection to the server was lost.
    #[error("Server disconnected: {0}")]
    Disconnected(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Protocol error (malformed reply).
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => Self::Disconnected(err.to_string()),
            _ => Self::Io(err),
        }
    }
}

impl Error {
    /// Creates a generic reply error from a reply code and message.
    #[must_use]
    pub fn response(code: u16, message: impl Into<String>) -> Self {
        Self::Response {
            code,
            message: message.into(),
        }
    }

    /// Returns the server reply code, if this error carries one.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::Helo { code, .. }
            | Self::Response { code, .. }
            | Self::SenderRefused { code, .. }
            | Self::RecipientRefused { code, .. }
            | Self::Data { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the server reply message, if this error carries one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Helo { message, .. }
            | Self::Response { message, .. }
            | Self::SenderRefused { message, .. }
            | Self::RecipientRefused { message, .. }
            | Self::Data { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.code(), Some(code) if code >= 500 && code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.code(), Some(code) if code >= 400 && code < 500)
    }

    /// Returns true if the transport was lost.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}
