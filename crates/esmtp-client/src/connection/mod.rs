//! SMTP session management.
//!
//! [`Client`] drives one session over a [`Transport`]. [`SessionState`]
//! holds what the server has told it so far, and [`SmtpStream`] is the
//! TCP/TLS transport used outside of tests.

mod client;
mod config;
mod state;
mod stream;
mod tls;
mod transport;

pub use client::{Client, SendReport};
pub use config::{
    ClientCertificate, DEFAULT_PORT, DEFAULT_TLS_PORT, SessionConfig, SessionConfigBuilder,
    StartTlsOptions,
};
pub use state::SessionState;
pub use stream::{SmtpStream, connect, read_reply_from};
pub use tls::client_config;
pub use transport::Transport;
