//! SMTP client session.

use std::time::Duration;

use super::config::{SessionConfig, StartTlsOptions};
use super::state::SessionState;
use super::stream::{SmtpStream, connect};
use super::tls::client_config;
use super::transport::Transport;
use crate::command::{Command, CommandKind, encode_message_data};
use crate::error::{Error, Result};
use crate::types::{AuthMethods, Extensions, Reply, ReplyCode};

/// Outcome of [`Client::send_raw`].
#[derive(Debug)]
pub struct SendReport {
    /// Recipients the server refused, as [`Error::RecipientRefused`].
    pub refused: Vec<Error>,
    /// Final reply to the message data.
    pub reply: Reply,
}

/// SMTP client session over a [`Transport`].
///
/// Commands are sent one at a time; every method takes `&mut self`, so a
/// second command cannot start before the previous reply has been read.
///
/// Command methods take an optional `timeout` that bounds each write, read
/// and handshake of that call; `None` uses [`SessionConfig::timeout`].
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
}

impl Client<SmtpStream> {
    /// Connects to the configured server and reads its greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the server does not
    /// greet with 220.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let stream = connect(&config).await?;
        let mut client = Self::new(stream, config);
        client.read_greeting().await?;
        Ok(client)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a session over an established transport without any I/O.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: SessionState::new(),
        }
    }

    /// Reads the server greeting sent on connect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] and closes the session if the greeting is
    /// not 220.
    pub async fn read_greeting(&mut self) -> Result<Reply> {
        let reply = self.transport.read_reply(self.config.timeout).await?;
        if reply.code != ReplyCode::SERVICE_READY {
            self.close();
            return Err(Error::response(reply.code.as_u16(), reply.message));
        }
        Ok(reply)
    }

    /// Sends a command and classifies the reply.
    ///
    /// `timeout` bounds the write and the read separately and defaults to
    /// the session timeout. Session state is not updated here; use the
    /// dedicated methods for HELO, EHLO, QUIT, DATA and STARTTLS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] before any I/O if an argument holds a
    /// line break, otherwise the error tied to the command kind for an
    /// unexpected reply code, or a transport error.
    pub async fn execute_command(
        &mut self,
        command: &Command,
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        let reply = self.send(command, timeout).await?;
        command.check(reply)
    }

    async fn send(&mut self, command: &Command, timeout: Option<Duration>) -> Result<Reply> {
        command.validate()?;
        if !self.transport.is_connected() {
            return Err(Error::Disconnected("Not connected".into()));
        }

        let timeout = timeout.unwrap_or(self.config.timeout);
        tracing::debug!(command = command.kind().verb(), "Sending command");

        self.transport
            .write_line(&command.serialize(), timeout)
            .await?;
        self.transport.read_reply(timeout).await
    }

    /// Sends HELO. `hostname` defaults to the configured local hostname.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Helo`] unless the server replies 250.
    pub async fn helo(
        &mut self,
        hostname: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        let command = Command::Helo {
            hostname: self.greeting_name(hostname),
        };
        let reply = self.execute_command(&command, timeout).await?;
        self.state.record_helo(reply.clone());
        Ok(reply)
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// `hostname` defaults to the configured local hostname.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Helo`] unless the server replies 250; the caller may
    /// then fall back to [`helo`](Self::helo).
    pub async fn ehlo(
        &mut self,
        hostname: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        let command = Command::Ehlo {
            hostname: self.greeting_name(hostname),
        };
        let reply = self.execute_command(&command, timeout).await?;
        self.state.record_ehlo(reply.clone());
        Ok(reply)
    }

    /// Greets the server unless a HELO or EHLO already succeeded.
    ///
    /// EHLO is tried first; a rejected EHLO falls back to HELO.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Helo`] if both greetings are rejected, or a
    /// transport error.
    pub async fn ehlo_or_helo_if_needed(&mut self) -> Result<()> {
        if !self.state.needs_greeting() {
            return Ok(());
        }

        match self.ehlo(None, None).await {
            Ok(_) => Ok(()),
            Err(Error::Helo { code, .. }) => {
                tracing::debug!(code, "EHLO rejected, falling back to HELO");
                self.helo(None, None).await.map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    /// Sends HELP and returns the help text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] unless the server replies 211, 214 or 250.
    pub async fn help(&mut self, timeout: Option<Duration>) -> Result<String> {
        let reply = self.execute_command(&Command::Help, timeout).await?;
        Ok(reply.message)
    }

    /// Sends RSET, clearing the server's envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] unless the server replies 250.
    pub async fn rset(&mut self, timeout: Option<Duration>) -> Result<Reply> {
        self.execute_command(&Command::Rset, timeout).await
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] unless the server replies 250.
    pub async fn noop(&mut self, timeout: Option<Duration>) -> Result<Reply> {
        self.execute_command(&Command::Noop, timeout).await
    }

    /// Sends VRFY for an address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] unless the server replies 250, 251 or 252.
    pub async fn vrfy(&mut self, address: &str, timeout: Option<Duration>) -> Result<Reply> {
        let command = Command::Vrfy {
            address: address.to_string(),
        };
        self.execute_command(&command, timeout).await
    }

    /// Sends EXPN for a mailing list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] unless the server replies 250.
    pub async fn expn(&mut self, address: &str, timeout: Option<Duration>) -> Result<Reply> {
        let command = Command::Expn {
            address: address.to_string(),
        };
        self.execute_command(&command, timeout).await
    }

    /// Sends QUIT and closes the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] unless the server replies 221; the
    /// transport stays open in that case.
    pub async fn quit(&mut self, timeout: Option<Duration>) -> Result<Reply> {
        let reply = self.execute_command(&Command::Quit, timeout).await?;
        self.close();
        Ok(reply)
    }

    /// Sends MAIL FROM, opening a new envelope.
    ///
    /// An empty `sender` sends the null reverse-path `<>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SenderRefused`] unless the server replies 250.
    pub async fn mail(
        &mut self,
        sender: &str,
        options: &[&str],
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        let command = Command::MailFrom {
            sender: sender.to_string(),
            options: options.iter().map(ToString::to_string).collect(),
        };
        self.execute_command(&command, timeout).await
    }

    /// Sends RCPT TO for one recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecipientRefused`] unless the server replies 250 or 251.
    pub async fn rcpt(
        &mut self,
        recipient: &str,
        options: &[&str],
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        let command = Command::RcptTo {
            recipient: recipient.to_string(),
            options: options.iter().map(ToString::to_string).collect(),
        };
        self.execute_command(&command, timeout).await
    }

    /// Sends DATA followed by the message and its terminator.
    ///
    /// The message is encoded with [`encode_message_data`]. A lost
    /// connection during either phase closes the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Data`] if the server does not reply 354 to DATA or
    /// 250 to the message.
    pub async fn data(&mut self, message: &[u8], timeout: Option<Duration>) -> Result<Reply> {
        let timeout = timeout.unwrap_or(self.config.timeout);

        let start = self.send(&Command::Data, Some(timeout)).await;
        let start = self.close_on_disconnect(start)?;
        Command::Data.check(start)?;

        let payload = encode_message_data(message);
        let sent = match self.transport.write_data(&payload, timeout).await {
            Ok(()) => self.transport.read_reply(timeout).await,
            Err(e) => Err(e),
        };
        let reply = self.close_on_disconnect(sent)?;

        CommandKind::DataEnd.check(reply)
    }

    /// Upgrades the connection with STARTTLS.
    ///
    /// Greets the server first if needed. After a successful handshake all
    /// knowledge from the plaintext session is discarded (RFC 3207 §4.2);
    /// send EHLO again to learn the capabilities offered over TLS.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if both a TLS config and a client
    ///   certificate are set, before any I/O.
    /// - [`Error::NotSupported`] if the server does not advertise STARTTLS;
    ///   nothing is sent in that case.
    /// - [`Error::Response`] unless the server replies 220.
    /// - [`Error::Disconnected`] if the connection is lost; the session is
    ///   closed.
    pub async fn starttls(&mut self, options: StartTlsOptions) -> Result<Reply> {
        let StartTlsOptions {
            server_hostname,
            validate_certs,
            client_cert,
            tls_config,
            timeout,
        } = options;

        let tls = client_config(
            tls_config.or_else(|| self.config.tls_config.clone()),
            client_cert
                .or_else(|| self.config.client_cert.clone())
                .as_ref(),
            validate_certs.unwrap_or(self.config.validate_certs),
        )?;
        let server_name = server_hostname.unwrap_or_else(|| self.config.host.clone());
        let timeout = timeout.unwrap_or(self.config.timeout);

        self.ehlo_or_helo_if_needed().await?;

        if !self.supports_extension("starttls") {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.send(&Command::StartTls, Some(timeout)).await;
        let reply = Command::StartTls.check(self.close_on_disconnect(reply)?)?;

        if let Err(e) = self.transport.upgrade_tls(tls, &server_name, timeout).await {
            tracing::warn!(error = %e, "TLS handshake failed, closing connection");
            self.close();
            return Err(e);
        }

        self.state.reset();
        tracing::info!(server_name = %server_name, "TLS established");

        Ok(reply)
    }

    /// Sends one message: greeting if needed, MAIL, RCPT for every
    /// recipient, then DATA.
    ///
    /// Refused recipients are collected in the report as long as at least
    /// one recipient is accepted. The envelope is reset when the sender,
    /// every recipient or the message is refused.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if `recipients` is empty.
    /// - [`Error::SenderRefused`] if MAIL is refused.
    /// - [`Error::RecipientsRefused`] if every recipient is refused.
    /// - [`Error::Data`] if the message is refused.
    pub async fn send_raw(
        &mut self,
        sender: &str,
        recipients: &[&str],
        message: &[u8],
    ) -> Result<SendReport> {
        if recipients.is_empty() {
            return Err(Error::Configuration("No recipients given".into()));
        }

        self.ehlo_or_helo_if_needed().await?;

        if let Err(e) = self.mail(sender, &[], None).await {
            self.rset_after_refusal(&e).await;
            return Err(e);
        }

        let mut refused = Vec::new();
        for recipient in recipients {
            match self.rcpt(recipient, &[], None).await {
                Ok(_) => {}
                Err(e @ Error::RecipientRefused { .. }) => refused.push(e),
                Err(e) => return Err(e),
            }
        }

        if refused.len() == recipients.len() {
            let err = Error::RecipientsRefused(refused);
            self.rset_after_refusal(&err).await;
            return Err(err);
        }

        match self.data(message, None).await {
            Ok(reply) => Ok(SendReport { refused, reply }),
            Err(e) => {
                self.rset_after_refusal(&e).await;
                Err(e)
            }
        }
    }

    /// Best-effort RSET after the server refused part of a transaction.
    async fn rset_after_refusal(&mut self, err: &Error) {
        if err.code().is_none() && !matches!(err, Error::RecipientsRefused(_)) {
            return;
        }
        if let Err(e) = self.rset(None).await {
            tracing::debug!(error = %e, "RSET after refusal failed");
        }
    }

    fn close_on_disconnect<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result
            && e.is_disconnect()
        {
            tracing::warn!(error = %e, "Connection lost, closing session");
            self.close();
        }
        result
    }

    fn greeting_name(&self, hostname: Option<&str>) -> String {
        hostname
            .unwrap_or(&self.config.local_hostname)
            .to_string()
    }

    /// Closes the transport. Learned server state is kept.
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Returns true while the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Checks if the server advertised an extension (case-insensitive).
    #[must_use]
    pub fn supports_extension(&self, name: &str) -> bool {
        self.state.supports(name)
    }

    /// True until a HELO or EHLO has succeeded in this session.
    #[must_use]
    pub const fn is_greeting_needed(&self) -> bool {
        self.state.needs_greeting()
    }

    /// Extensions advertised in the last EHLO reply.
    #[must_use]
    pub const fn extensions(&self) -> &Extensions {
        self.state.extensions()
    }

    /// Authentication mechanisms advertised in the last EHLO reply.
    #[must_use]
    pub const fn auth_methods(&self) -> &AuthMethods {
        self.state.auth_methods()
    }

    /// The negotiated session state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the client and returns the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}
