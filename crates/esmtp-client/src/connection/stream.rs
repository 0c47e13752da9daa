//! Low-level SMTP stream handling.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::config::SessionConfig;
use super::tls::client_config;
use super::transport::Transport;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::Reply;

/// Maximum reply line length, excluding CRLF.
const MAX_LINE_LENGTH: usize = 8192;

/// SMTP stream (TCP or TLS).
#[derive(Debug, Default)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Plain(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<TlsStream<TcpStream>>>),
    /// No connection.
    #[default]
    Closed,
}

impl SmtpStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(reader) => write_flush(reader.get_mut(), data).await,
            Self::Tls(reader) => write_flush(reader.get_mut(), data).await,
            Self::Closed => Err(not_connected()),
        }
    }
}

impl Transport for SmtpStream {
    async fn write_line(&mut self, line: &[u8], timeout: Duration) -> Result<()> {
        with_timeout(timeout, self.write_all(line)).await
    }

    async fn write_data(&mut self, payload: &[u8], timeout: Duration) -> Result<()> {
        with_timeout(timeout, self.write_all(payload)).await
    }

    async fn read_reply(&mut self, timeout: Duration) -> Result<Reply> {
        match self {
            Self::Plain(reader) => with_timeout(timeout, read_reply_from(reader)).await,
            Self::Tls(reader) => with_timeout(timeout, read_reply_from(&mut **reader)).await,
            Self::Closed => Err(not_connected()),
        }
    }

    async fn upgrade_tls(
        &mut self,
        config: Arc<ClientConfig>,
        server_name: &str,
        timeout: Duration,
    ) -> Result<()> {
        let server_name = ServerName::try_from(server_name.to_string())?;

        let tcp = match std::mem::take(self) {
            Self::Plain(reader) => reader.into_inner(),
            tls @ Self::Tls(_) => {
                *self = tls;
                return Err(Error::Protocol("Already using TLS".into()));
            }
            Self::Closed => return Err(not_connected()),
        };

        let connector = TlsConnector::from(config);
        let tls = with_timeout(timeout, async {
            Ok::<_, Error>(connector.connect(server_name, tcp).await?)
        })
        .await?;

        *self = Self::Tls(Box::new(BufReader::new(tls)));
        Ok(())
    }

    fn close(&mut self) {
        *self = Self::Closed;
    }

    fn is_connected(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Connects to the server named in `config`.
///
/// With `use_tls` the TLS handshake happens right away (port 465 style);
/// otherwise the stream stays plaintext until STARTTLS.
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails or times out.
pub async fn connect(config: &SessionConfig) -> Result<SmtpStream> {
    let addr = (config.host.as_str(), config.port);
    let tcp = with_timeout(config.connect_timeout, async {
        Ok::<_, Error>(TcpStream::connect(addr).await?)
    })
    .await?;
    tracing::debug!(host = %config.host, port = config.port, "Connected");

    let mut stream = SmtpStream::Plain(BufReader::new(tcp));
    if config.use_tls {
        let tls = client_config(
            config.tls_config.clone(),
            config.client_cert.as_ref(),
            config.validate_certs,
        )?;
        stream
            .upgrade_tls(tls, &config.host, config.connect_timeout)
            .await?;
    }
    Ok(stream)
}

/// Reads one complete reply from a buffered reader.
///
/// # Errors
///
/// Returns [`Error::Disconnected`] if the stream ends before the last reply
/// line, or [`Error::Protocol`] for oversized or malformed lines.
pub async fn read_reply_from<R>(reader: &mut R) -> Result<Reply>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    let reply = parse_reply(&lines)?;
    tracing::trace!(code = reply.code.as_u16(), lines = lines.len(), "Reply");
    Ok(reply)
}

async fn read_line<R>(reader: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_LINE_LENGTH as u64 + 2;
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(limit)
        .read_until(b'\n', &mut buf)
        .await?;

    if read == 0 {
        return Err(Error::Disconnected("Connection closed by server".into()));
    }
    if !buf.ends_with(b"\n") {
        if buf.len() as u64 >= limit {
            discard_line(reader, limit).await?;
            return Err(Error::Protocol("Reply line too long".into()));
        }
        return Err(Error::Disconnected("Connection closed mid-reply".into()));
    }

    let line = String::from_utf8_lossy(&buf);
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Skips the rest of an oversized line.
async fn discard_line<R>(reader: &mut R, chunk: u64) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut rest = Vec::new();
    loop {
        rest.clear();
        let read = (&mut *reader).take(chunk).read_until(b'\n', &mut rest).await?;
        if read == 0 || rest.ends_with(b"\n") {
            return Ok(());
        }
    }
}

async fn write_flush<W>(writer: &mut W, data: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Bounds a single operation by `duration`.
pub(crate) async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| Error::Timeout(duration))?
}

fn not_connected() -> Error {
    Error::Disconnected("Not connected".into())
}
