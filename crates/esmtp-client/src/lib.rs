//! # esmtp-client
//!
//! An async ESMTP client session implementing RFC 5321 command exchange,
//! EHLO capability discovery and STARTTLS (RFC 3207).
//!
//! ## Features
//!
//! - **Session state**: HELO/EHLO replies and the advertised extensions are
//!   tracked per session and discarded on STARTTLS
//! - **Reply classification**: every command checks the reply code against
//!   its own success set and maps failures to a typed [`Error`]
//! - **Greeting fallback**: EHLO first, HELO when EHLO is rejected
//! - **TLS support**: Both implicit TLS (port 465) and STARTTLS
//! - **Pluggable transport**: [`Client`] runs over any [`Transport`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use esmtp_client::{Client, SessionConfig, StartTlsOptions};
//!
//! #[tokio::main]
//! async fn main() -> esmtp_client::Result<()> {
//!     let config = SessionConfig::builder("smtp.example.com")
//!         .port(587)
//!         .local_hostname("client.example.com")
//!         .build();
//!     let mut client = Client::connect(config).await?;
//!
//!     client.ehlo(None, None).await?;
//!     if client.supports_extension("starttls") {
//!         client.starttls(StartTlsOptions::new()).await?;
//!         client.ehlo(None, None).await?;
//!     }
//!
//!     let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//!     let report = client
//!         .send_raw("sender@example.com", &["recipient@example.com"], message)
//!         .await?;
//!     println!("queued: {}", report.reply);
//!
//!     client.quit(None).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Session flow
//!
//! ```text
//! connect ── 220 ──→ EHLO ─┬─ 250 ──→ extensions known ── STARTTLS ── 220 ──→ state reset
//!                          └─ 5xx ──→ HELO ── 250 ──→ plain SMTP
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP commands and reply classification
//! - [`connection`]: Session state, client and transport
//! - [`parser`]: Reply and EHLO parsers
//! - [`types`]: Core SMTP types (replies, extensions, addresses)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, CommandKind};
pub use connection::{
    Client, ClientCertificate, SendReport, SessionConfig, SessionConfigBuilder, SessionState,
    SmtpStream, StartTlsOptions, Transport,
};
pub use error::{Error, Result};
pub use types::{AuthMechanism, AuthMethods, Extensions, Reply, ReplyCode};
