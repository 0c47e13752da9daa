//! SMTP extension types.

use std::collections::HashMap;

/// ESMTP service extensions advertised in an EHLO reply.
///
/// Names are stored lowercase and looked up case-insensitively. Parameter
/// strings keep the casing the server sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions(HashMap<String, String>);

impl Extensions {
    /// Creates an empty extension set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an extension, replacing any earlier parameters for the name.
    pub fn insert(&mut self, name: &str, params: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), params.into());
    }

    /// Checks if the extension was advertised.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns the parameter string of an extension (possibly empty).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns the maximum message size, if advertised via SIZE.
    ///
    /// A SIZE of zero means the server declares no fixed limit.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.get("size")?
            .split_whitespace()
            .next()?
            .parse()
            .ok()
            .filter(|&size| size > 0)
    }

    /// Iterates over `(name, params)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no extensions are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Authentication mechanisms advertised by the server, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMethods(Vec<String>);

impl AuthMethods {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a mechanism unless it is already present.
    pub fn push(&mut self, method: &str) {
        let method = method.trim().to_ascii_lowercase();
        if !method.is_empty() && !self.0.contains(&method) {
            self.0.push(method);
        }
    }

    /// Checks if a mechanism name was advertised (case-insensitive).
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        let method = method.to_ascii_lowercase();
        self.0.contains(&method)
    }

    /// Checks if a known mechanism was advertised.
    #[must_use]
    pub fn supports(&self, mechanism: AuthMechanism) -> bool {
        self.contains(mechanism.as_str())
    }

    /// Returns the mechanism names.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns the advertised mechanisms this crate knows by name.
    pub fn mechanisms(&self) -> impl Iterator<Item = AuthMechanism> + '_ {
        self.0.iter().filter_map(|m| AuthMechanism::parse(m))
    }

    /// Returns the number of mechanisms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no mechanisms are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - legacy plaintext
    Login,
    /// CRAM-MD5 - challenge-response
    CramMd5,
    /// `XOAUTH2` - `OAuth2` (Google/Microsoft)
    XOAuth2,
    /// `OAUTHBEARER` - RFC 7628 `OAuth2`
    OAuthBearer,
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" => Some(Self::CramMd5),
            "XOAUTH2" => Some(Self::XOAuth2),
            "OAUTHBEARER" => Some(Self::OAuthBearer),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
            Self::XOAuth2 => "XOAUTH2",
            Self::OAuthBearer => "OAUTHBEARER",
        }
    }
}
