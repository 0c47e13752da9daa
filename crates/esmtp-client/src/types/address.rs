//! Envelope address helpers.
//!
//! No syntax validation happens here; the server is the authority on what
//! it accepts.

/// Extracts the bare address from `addr`.
///
/// Accepts `user@example.com`, `<user@example.com>` and
/// `Display Name <user@example.com>` forms.
#[must_use]
pub fn parse_address(addr: &str) -> &str {
    let addr = addr.trim();
    match (addr.rfind('<'), addr.rfind('>')) {
        (Some(open), Some(close)) if open < close => addr[open + 1..close].trim(),
        _ => addr,
    }
}

/// Wraps an address in angle brackets for MAIL FROM / RCPT TO.
///
/// An empty address becomes the null reverse-path `<>`.
#[must_use]
pub fn quote_address(addr: &str) -> String {
    format!("<{}>", parse_address(addr))
}
