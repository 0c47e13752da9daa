//! Negotiated session state.

use crate::parser::parse_extensions;
use crate::types::{AuthMethods, Extensions, Reply};

/// What the client has learned from the server during this session.
///
/// Only three operations mutate it: [`record_helo`](Self::record_helo),
/// [`record_ehlo`](Self::record_ehlo) and [`reset`](Self::reset). The
/// extension set is re-derived in full from every recorded EHLO reply and
/// only `reset` can empty it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    last_helo: Option<Reply>,
    last_ehlo: Option<Reply>,
    extensions: Extensions,
    auth_methods: AuthMethods,
    esmtp_confirmed: bool,
}

impl SessionState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a successful HELO reply.
    pub fn record_helo(&mut self, reply: Reply) {
        self.last_helo = Some(reply);
    }

    /// Stores a successful EHLO reply and replaces the capability set with
    /// the one it advertises.
    pub fn record_ehlo(&mut self, reply: Reply) {
        let (extensions, auth_methods) = parse_extensions(&reply.message);
        self.extensions = extensions;
        self.auth_methods = auth_methods;
        self.last_ehlo = Some(reply);
        self.esmtp_confirmed = true;
    }

    /// Forgets everything learned from the server.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Checks if the server advertised an extension (case-insensitive).
    #[must_use]
    pub fn supports(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    /// True until a HELO or EHLO has succeeded.
    #[must_use]
    pub const fn needs_greeting(&self) -> bool {
        self.last_helo.is_none() && self.last_ehlo.is_none()
    }

    /// True once the server answered EHLO.
    #[must_use]
    pub const fn esmtp_confirmed(&self) -> bool {
        self.esmtp_confirmed
    }

    /// Advertised extensions.
    #[must_use]
    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Advertised authentication mechanisms.
    #[must_use]
    pub const fn auth_methods(&self) -> &AuthMethods {
        &self.auth_methods
    }

    /// The last successful HELO reply.
    #[must_use]
    pub const fn last_helo(&self) -> Option<&Reply> {
        self.last_helo.as_ref()
    }

    /// The last successful EHLO reply.
    #[must_use]
    pub const fn last_ehlo(&self) -> Option<&Reply> {
        self.last_ehlo.as_ref()
    }
}
