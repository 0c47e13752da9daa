//! DATA payload encoding (RFC 5321 §4.5.2).

use bytes::{BufMut, Bytes, BytesMut};

/// Encodes a message for transmission after a 354 reply.
///
/// Line endings (`\r\n`, bare `\n`, bare `\r`) are normalized to CRLF, lines
/// starting with `.` are dot-stuffed, a final CRLF is added if missing, and
/// the terminating `.\r\n` line is appended.
#[must_use]
pub fn encode_message_data(message: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(message.len() + message.len() / 64 + 5);
    let mut at_line_start = true;
    let mut bytes = message.iter().copied().peekable();

    while let Some(b) = bytes.next() {
        match b {
            b'\r' => {
                if bytes.peek() == Some(&b'\n') {
                    bytes.next();
                }
                buf.put_slice(b"\r\n");
                at_line_start = true;
            }
            b'\n' => {
                buf.put_slice(b"\r\n");
                at_line_start = true;
            }
            _ => {
                if at_line_start && b == b'.' {
                    buf.put_u8(b'.');
                }
                buf.put_u8(b);
                at_line_start = false;
            }
        }
    }

    if !buf.is_empty() && !buf.ends_with(b"\r\n") {
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(b".\r\n");
    buf.freeze()
}
