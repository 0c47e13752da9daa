//! Transport abstraction used by the client.

use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;

use crate::error::Result;
use crate::types::Reply;

/// A connection to an SMTP server.
///
/// Every I/O method is bounded by the given timeout and reports
/// [`Error::Timeout`](crate::Error::Timeout) when it elapses. A lost
/// connection is reported as [`Error::Disconnected`](crate::Error::Disconnected).
/// Implementations must write each line atomically so a cancelled write is
/// never mistaken for a different command.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Writes one CRLF-terminated command line.
    async fn write_line(&mut self, line: &[u8], timeout: Duration) -> Result<()>;

    /// Writes an already encoded DATA payload, terminator included.
    async fn write_data(&mut self, payload: &[u8], timeout: Duration) -> Result<()>;

    /// Reads one complete (possibly multi-line) reply.
    async fn read_reply(&mut self, timeout: Duration) -> Result<Reply>;

    /// Performs the TLS handshake and continues over the encrypted stream.
    async fn upgrade_tls(
        &mut self,
        config: Arc<ClientConfig>,
        server_name: &str,
        timeout: Duration,
    ) -> Result<()>;

    /// Drops the connection. Calling it again has no effect.
    fn close(&mut self);

    /// Returns true until the connection is closed.
    fn is_connected(&self) -> bool;
}
