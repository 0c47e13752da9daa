//! EHLO reply parsing (RFC 1869 / RFC 5321 §4.1.1.1).

use crate::types::{AuthMethods, Extensions};

/// Parses the message of an EHLO reply into extensions and auth methods.
///
/// The first line is the server greeting and is ignored. Every other line is
/// an extension keyword optionally followed by parameters:
///
/// ```text
/// smtp.example.com Hello client.example.com
/// SIZE 51200000
/// AUTH LOGIN PLAIN
/// AUTH=LOGIN
/// STARTTLS
/// ```
///
/// Servers that predate RFC 2554 advertise mechanisms as `AUTH=<mech>`; the
/// first mechanism of such a line is picked up as well. Both readings of an
/// `AUTH=` line apply independently, so `AUTH=LOGIN` yields `login` and
/// `=login`. Lines that do not start with a keyword are skipped, so this
/// never fails.
#[must_use]
pub fn parse_extensions(message: &str) -> (Extensions, AuthMethods) {
    let mut extensions = Extensions::new();
    let mut auth_methods = AuthMethods::new();

    for line in message.split('\n').skip(1) {
        if let Some(method) = old_style_auth(line) {
            auth_methods.push(method);
        }

        let Some((keyword, params)) = split_keyword(line) else {
            continue;
        };
        let name = keyword.to_ascii_lowercase();

        // `AUTH=LOGIN` also matches here as keyword `AUTH` with params
        // `=LOGIN`, which adds `=login` as well
        if name == "auth" {
            for method in params.split_whitespace() {
                auth_methods.push(method);
            }
        }

        extensions.insert(&name, params);
    }

    (extensions, auth_methods)
}

/// Returns the first mechanism of an `AUTH=` line.
fn old_style_auth(line: &str) -> Option<&str> {
    let prefix = line.get(..5)?;
    if !prefix.eq_ignore_ascii_case("auth=") {
        return None;
    }
    line[5..].split_whitespace().next()
}

/// Splits a line into its extension keyword and trimmed parameters.
///
/// Keywords are `[A-Za-z0-9][A-Za-z0-9-]*`.
fn split_keyword(line: &str) -> Option<(&str, &str)> {
    if !line.as_bytes().first()?.is_ascii_alphanumeric() {
        return None;
    }

    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(line.len());

    Some((&line[..end], line[end..].trim()))
}
