//! Integration tests for the ESMTP client session.
//!
//! These tests drive [`Client`] over a mock transport that replays scripted
//! server replies and records everything the client writes.

#![allow(clippy::unwrap_used, clippy::missing_const_for_fn)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use rustls::pki_types::{CertificateDer, PrivatePkcs8KeyDer};

use esmtp_client::connection::{client_config, read_reply_from};
use esmtp_client::{
    Client, ClientCertificate, Command, Error, Reply, ReplyCode, Result, SessionConfig,
    StartTlsOptions, Transport,
};

/// Transport that returns predefined reply bytes.
struct MockTransport {
    /// Server replies, in wire format.
    incoming: Cursor<Vec<u8>>,
    /// Command lines and DATA payloads sent by the client.
    sent: Vec<u8>,
    /// Server names passed to each TLS upgrade.
    upgrades: Vec<String>,
    /// Timeout handed to every write and read, in call order.
    timeouts: Vec<Duration>,
    fail_upgrade: bool,
    open: bool,
}

impl MockTransport {
    fn new(replies: &str) -> Self {
        Self {
            incoming: Cursor::new(replies.as_bytes().to_vec()),
            sent: Vec::new(),
            upgrades: Vec::new(),
            timeouts: Vec::new(),
            fail_upgrade: false,
            open: true,
        }
    }

    fn sent_text(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.open {
            return Err(Error::Disconnected("Not connected".into()));
        }
        self.sent.extend_from_slice(bytes);
        Ok(())
    }
}

impl Transport for MockTransport {
    async fn write_line(&mut self, line: &[u8], timeout: Duration) -> Result<()> {
        self.timeouts.push(timeout);
        self.write(line)
    }

    async fn write_data(&mut self, payload: &[u8], timeout: Duration) -> Result<()> {
        self.timeouts.push(timeout);
        self.write(payload)
    }

    async fn read_reply(&mut self, timeout: Duration) -> Result<Reply> {
        self.timeouts.push(timeout);
        if !self.open {
            return Err(Error::Disconnected("Not connected".into()));
        }
        read_reply_from(&mut self.incoming).await
    }

    async fn upgrade_tls(
        &mut self,
        _config: Arc<ClientConfig>,
        server_name: &str,
        _timeout: Duration,
    ) -> Result<()> {
        self.upgrades.push(server_name.to_string());
        if self.fail_upgrade {
            return Err(Error::Disconnected("handshake failed".into()));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_connected(&self) -> bool {
        self.open
    }
}

/// Routes client logs to the test output; set `RUST_LOG=esmtp_client=trace` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn client(replies: &str) -> Client<MockTransport> {
    init_tracing();
    Client::new(MockTransport::new(replies), SessionConfig::new("smtp.example.com"))
}

const EHLO_STARTTLS: &str = "250-example.com\r\n250-SIZE 10240000\r\n250 STARTTLS\r\n";

fn dummy_cert() -> ClientCertificate {
    ClientCertificate::new(
        vec![CertificateDer::from(vec![0u8; 4])],
        PrivatePkcs8KeyDer::from(vec![0u8; 4]).into(),
    )
}

#[tokio::test]
async fn test_greeting() {
    let mut client = client("220 smtp.example.com ESMTP ready\r\n");
    let reply = client.read_greeting().await.unwrap();
    assert_eq!(reply.code, ReplyCode::SERVICE_READY);
    assert!(client.is_connected());
    assert!(client.is_greeting_needed());
}

#[tokio::test]
async fn test_greeting_refused_closes() {
    let mut client = client("554 go away\r\n");
    let err = client.read_greeting().await.unwrap_err();
    assert!(matches!(err, Error::Response { code: 554, .. }));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_ehlo_records_extensions() {
    let mut client = client(EHLO_STARTTLS);

    let reply = client.ehlo(None, None).await.unwrap();
    assert_eq!(reply.message, "example.com\nSIZE 10240000\nSTARTTLS");

    assert!(client.supports_extension("starttls"));
    assert!(client.supports_extension("STARTTLS"));
    assert!(client.supports_extension("size"));
    assert_eq!(client.extensions().get("size"), Some("10240000"));
    assert_eq!(client.extensions().max_message_size(), Some(10_240_000));
    assert!(!client.supports_extension("pipelining"));
    assert!(!client.is_greeting_needed());
    assert!(client.state().esmtp_confirmed());
    assert_eq!(client.transport().sent_text(), "EHLO localhost\r\n");
}

#[tokio::test]
async fn test_ehlo_custom_hostname() {
    let mut client = client("250 example.com\r\n");
    client.ehlo(Some("client.example.org"), None).await.unwrap();
    assert_eq!(client.transport().sent_text(), "EHLO client.example.org\r\n");
}

#[tokio::test]
async fn test_ehlo_auth_methods() {
    let mut client =
        client("250-example.com\r\n250-AUTH PLAIN LOGIN\r\n250 AUTH=XOAUTH2\r\n");
    client.ehlo(None, None).await.unwrap();

    let methods = client.auth_methods();
    assert!(methods.contains("plain"));
    assert!(methods.contains("login"));
    assert!(methods.contains("xoauth2"));
    assert!(methods.contains("=xoauth2"));
    assert_eq!(methods.len(), 4);
}

#[tokio::test]
async fn test_ehlo_rejected_falls_back_to_helo() {
    let mut client = client("502 EHLO not implemented\r\n250 example.com\r\n");

    client.ehlo_or_helo_if_needed().await.unwrap();

    assert_eq!(
        client.transport().sent_text(),
        "EHLO localhost\r\nHELO localhost\r\n"
    );
    assert!(!client.is_greeting_needed());
    assert!(!client.state().esmtp_confirmed());
    assert!(client.state().last_helo().is_some());
    assert!(client.state().last_ehlo().is_none());
    assert!(client.extensions().is_empty());
}

#[tokio::test]
async fn test_greeting_both_rejected() {
    let mut client = client("500 no\r\n501 still no\r\n");
    let err = client.ehlo_or_helo_if_needed().await.unwrap_err();
    assert!(matches!(err, Error::Helo { code: 501, .. }));
    assert!(client.is_greeting_needed());
}

#[tokio::test]
async fn test_greeting_not_repeated() {
    let mut client = client("250 example.com\r\n");
    client.ehlo_or_helo_if_needed().await.unwrap();
    client.ehlo_or_helo_if_needed().await.unwrap();
    assert_eq!(client.transport().sent_text(), "EHLO localhost\r\n");
}

#[tokio::test]
async fn test_mail_refused_keeps_sender() {
    let mut client = client("550 mailbox unavailable\r\n");

    let err = client.mail("a@b.example", &[], None).await.unwrap_err();
    match err {
        Error::SenderRefused {
            code,
            message,
            sender,
        } => {
            assert_eq!(code, 550);
            assert_eq!(message, "mailbox unavailable");
            assert_eq!(sender, "a@b.example");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.transport().sent_text(), "MAIL FROM:<a@b.example>\r\n");
}

#[tokio::test]
async fn test_mail_with_options() {
    let mut client = client("250 OK\r\n");
    client
        .mail("a@b.example", &["SIZE=1000", "BODY=8BITMIME"], None)
        .await
        .unwrap();
    assert_eq!(
        client.transport().sent_text(),
        "MAIL FROM:<a@b.example> SIZE=1000 BODY=8BITMIME\r\n"
    );
}

#[tokio::test]
async fn test_mail_null_sender() {
    let mut client = client("250 OK\r\n");
    client.mail("", &[], None).await.unwrap();
    assert_eq!(client.transport().sent_text(), "MAIL FROM:<>\r\n");
}

#[tokio::test]
async fn test_rcpt_forward_is_success() {
    let mut client = client("251 User not local; will forward\r\n");
    let reply = client.rcpt("c@d.example", &[], None).await.unwrap();
    assert_eq!(reply.code, ReplyCode::FORWARD);
    assert_eq!(client.transport().sent_text(), "RCPT TO:<c@d.example>\r\n");
}

#[tokio::test]
async fn test_rcpt_refused_keeps_recipient() {
    let mut client = client("450 try later\r\n");
    let err = client.rcpt("c@d.example", &[], None).await.unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(
        err,
        Error::RecipientRefused { code: 450, ref recipient, .. } if recipient == "c@d.example"
    ));
}

#[tokio::test]
async fn test_starttls_resets_state() {
    let mut client = client(&format!("{EHLO_STARTTLS}220 Ready to start TLS\r\n"));

    let reply = client.starttls(StartTlsOptions::new()).await.unwrap();
    assert_eq!(reply.code, ReplyCode::SERVICE_READY);

    assert_eq!(client.transport().upgrades, vec!["smtp.example.com"]);
    assert_eq!(
        client.transport().sent_text(),
        "EHLO localhost\r\nSTARTTLS\r\n"
    );
    assert!(!client.supports_extension("starttls"));
    assert!(client.is_greeting_needed());
    assert!(client.state().last_ehlo().is_none());
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_starttls_server_hostname_override() {
    let mut client = client(&format!("{EHLO_STARTTLS}220 go ahead\r\n"));
    client
        .starttls(StartTlsOptions::new().server_hostname("mx.example.net"))
        .await
        .unwrap();
    assert_eq!(client.transport().upgrades, vec!["mx.example.net"]);
}

#[tokio::test]
async fn test_starttls_not_supported_sends_nothing() {
    let mut client = client("250-example.com\r\n250 SIZE 1000\r\n");
    client.ehlo(None, None).await.unwrap();
    client.transport_mut().sent.clear();

    let err = client.starttls(StartTlsOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::NotSupported(ref ext) if ext == "STARTTLS"));
    assert!(client.transport().sent.is_empty());
    assert!(client.transport().upgrades.is_empty());
}

#[tokio::test]
async fn test_starttls_conflicting_tls_options() {
    let config = SessionConfig::builder("smtp.example.com")
        .client_cert(dummy_cert())
        .build();
    let mut client = Client::new(MockTransport::new(EHLO_STARTTLS), config);

    let tls = client_config(None, None, true).unwrap();
    let err = client
        .starttls(StartTlsOptions::new().tls_config(tls))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Configuration(_)));
    assert!(client.transport().sent.is_empty());
    assert!(client.is_greeting_needed());
}

#[tokio::test]
async fn test_starttls_refused() {
    let mut client = client(&format!("{EHLO_STARTTLS}454 TLS not available\r\n"));

    let err = client.starttls(StartTlsOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::Response { code: 454, .. }));
    assert!(client.transport().upgrades.is_empty());
    assert!(client.supports_extension("starttls"));
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_starttls_handshake_failure_closes() {
    let mut transport = MockTransport::new(&format!("{EHLO_STARTTLS}220 go ahead\r\n"));
    transport.fail_upgrade = true;
    let mut client = Client::new(transport, SessionConfig::new("smtp.example.com"));

    let err = client.starttls(StartTlsOptions::new()).await.unwrap_err();
    assert!(err.is_disconnect());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_starttls_disconnect_closes() {
    let mut client = client(EHLO_STARTTLS);

    let err = client.starttls(StartTlsOptions::new()).await.unwrap_err();
    assert!(err.is_disconnect());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_data_accepted() {
    let mut client = client("354 End data with <CR><LF>.<CR><LF>\r\n250 2.0.0 queued\r\n");

    let reply = client.data(b"Subject: hi\n\n.hidden\nbody", None).await.unwrap();
    assert_eq!(reply.code, ReplyCode::OK);
    assert_eq!(
        client.transport().sent_text(),
        "DATA\r\nSubject: hi\r\n\r\n..hidden\r\nbody\r\n.\r\n"
    );
}

#[tokio::test]
async fn test_data_refused_before_payload() {
    let mut client = client("554 no valid recipients\r\n");

    let err = client.data(b"body", None).await.unwrap_err();
    assert!(matches!(err, Error::Data { code: 554, .. }));
    assert_eq!(client.transport().sent_text(), "DATA\r\n");
}

#[tokio::test]
async fn test_data_payload_refused() {
    let mut client = client("354 go ahead\r\n552 too big\r\n");

    let err = client.data(b"body", None).await.unwrap_err();
    assert!(matches!(err, Error::Data { code: 552, .. }));
    assert!(err.is_permanent());
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_data_disconnect_closes() {
    let mut client = client("354 go ahead\r\n");

    let err = client.data(b"body", None).await.unwrap_err();
    assert!(err.is_disconnect());
    assert!(!client.is_connected());

    let err = client.noop(None).await.unwrap_err();
    assert!(err.is_disconnect());
}

#[tokio::test]
async fn test_data_request_disconnect_closes() {
    let mut client = client("");

    let err = client.data(b"x", None).await.unwrap_err();
    assert!(err.is_disconnect());
    assert!(!client.is_connected());
    assert_eq!(client.transport().sent_text(), "DATA\r\n");
}

#[tokio::test]
async fn test_data_timeout_override() {
    let mut client = client("354 go ahead\r\n250 queued\r\n");
    let timeout = Duration::from_secs(3);

    client.data(b"body", Some(timeout)).await.unwrap();

    // DATA line, 354 read, payload write, final read
    assert_eq!(client.transport().timeouts, vec![timeout; 4]);
}

#[tokio::test]
async fn test_command_timeout_defaults_to_session() {
    let config = SessionConfig::builder("smtp.example.com")
        .timeout(Duration::from_secs(7))
        .build();
    let mut client = Client::new(MockTransport::new("250 OK\r\n250 OK\r\n"), config);

    client.noop(None).await.unwrap();
    client
        .rcpt("c@d.example", &[], Some(Duration::from_millis(500)))
        .await
        .unwrap();

    assert_eq!(
        client.transport().timeouts,
        vec![
            Duration::from_secs(7),
            Duration::from_secs(7),
            Duration::from_millis(500),
            Duration::from_millis(500),
        ]
    );
}

#[tokio::test]
async fn test_line_break_in_argument_sends_nothing() {
    let mut client = client("250 OK\r\n");

    let err = client
        .mail("a@b.example>\r\nRCPT TO:<x@y.example", &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let err = client
        .rcpt("c@d.example", &["NOTIFY=NEVER\r\nQUIT"], None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    assert!(client.transport().sent.is_empty());
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_quit_closes() {
    let mut client = client("221 Bye\r\n");
    let reply = client.quit(None).await.unwrap();
    assert_eq!(reply.code, ReplyCode::CLOSING);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_quit_refused_stays_open() {
    let mut client = client("500 what\r\n");
    let err = client.quit(None).await.unwrap_err();
    assert!(matches!(err, Error::Response { code: 500, .. }));
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_help_and_vrfy() {
    let mut client = client(
        "214-Commands:\r\n214 HELO EHLO MAIL RCPT DATA\r\n252 Cannot verify\r\n550 no such user\r\n",
    );

    let help = client.help(None).await.unwrap();
    assert_eq!(help, "Commands:\nHELO EHLO MAIL RCPT DATA");

    let reply = client.vrfy("Jane <jane@example.com>", None).await.unwrap();
    assert_eq!(reply.code, ReplyCode::CANNOT_VERIFY);

    let err = client.vrfy("nobody@example.com", None).await.unwrap_err();
    assert!(matches!(err, Error::Response { code: 550, .. }));

    assert_eq!(
        client.transport().sent_text(),
        "HELP\r\nVRFY jane@example.com\r\nVRFY nobody@example.com\r\n"
    );
}

#[tokio::test]
async fn test_execute_command_when_closed() {
    let mut client = client("250 OK\r\n");
    client.close();

    let err = client.execute_command(&Command::Noop, None).await.unwrap_err();
    assert!(err.is_disconnect());
    assert!(client.transport().sent.is_empty());
}

#[tokio::test]
async fn test_execute_command_does_not_touch_state() {
    let mut client = client("250 example.com\r\n");
    let command = Command::Ehlo {
        hostname: "localhost".into(),
    };

    client.execute_command(&command, None).await.unwrap();
    assert!(client.is_greeting_needed());
}

#[tokio::test]
async fn test_send_raw_partial_refusal() {
    let mut client = client(
        "250 example.com\r\n250 OK\r\n550 unknown user\r\n250 OK\r\n354 go ahead\r\n250 queued\r\n",
    );

    let report = client
        .send_raw(
            "a@example.com",
            &["bad@example.com", "good@example.com"],
            b"Subject: hi\r\n\r\nbody\r\n",
        )
        .await
        .unwrap();

    assert_eq!(report.reply.code, ReplyCode::OK);
    assert_eq!(report.refused.len(), 1);
    assert!(matches!(
        &report.refused[0],
        Error::RecipientRefused { recipient, .. } if recipient == "bad@example.com"
    ));
}

#[tokio::test]
async fn test_send_raw_all_refused_resets() {
    let mut client = client("250 example.com\r\n250 OK\r\n550 unknown user\r\n250 reset\r\n");

    let err = client
        .send_raw("a@example.com", &["bad@example.com"], b"body")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RecipientsRefused(ref refused) if refused.len() == 1));
    assert!(client.transport().sent_text().ends_with("RSET\r\n"));
}

#[tokio::test]
async fn test_send_raw_requires_recipients() {
    let mut client = client("");
    let err = client.send_raw("a@example.com", &[], b"body").await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(client.transport().sent.is_empty());
}
