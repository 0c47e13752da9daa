//! SMTP commands and reply classification.
//!
//! Each command belongs to a [`CommandKind`], and each kind owns the set of
//! reply codes that count as success. Any other code becomes the error
//! variant tied to that kind.

mod data;

pub use data::encode_message_data;

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode, parse_address, quote_address};

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// HELP - Ask the server for help text
    Help,
    /// RSET - Reset transaction
    Rset,
    /// NOOP - No operation
    Noop,
    /// VRFY - Verify address
    Vrfy {
        /// Address to verify
        address: String,
    },
    /// EXPN - Expand mailing list
    Expn {
        /// List to expand
        address: String,
    },
    /// QUIT - Close connection
    Quit,
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address (empty for the null reverse-path)
        sender: String,
        /// ESMTP parameters such as `SIZE=1000` or `BODY=8BITMIME`
        options: Vec<String>,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        recipient: String,
        /// ESMTP parameters such as `NOTIFY=NEVER`
        options: Vec<String>,
    },
    /// DATA - Begin message data
    Data,
    /// STARTTLS - Upgrade to TLS
    StartTls,
}

impl Command {
    /// Returns the kind of this command.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Helo { .. } => CommandKind::Helo,
            Self::Ehlo { .. } => CommandKind::Ehlo,
            Self::Help => CommandKind::Help,
            Self::Rset => CommandKind::Rset,
            Self::Noop => CommandKind::Noop,
            Self::Vrfy { .. } => CommandKind::Vrfy,
            Self::Expn { .. } => CommandKind::Expn,
            Self::Quit => CommandKind::Quit,
            Self::MailFrom { .. } => CommandKind::Mail,
            Self::RcptTo { .. } => CommandKind::Rcpt,
            Self::Data => CommandKind::Data,
            Self::StartTls => CommandKind::StartTls,
        }
    }

    /// Checks that every argument fits on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if an argument contains CR or LF,
    /// which would split the line into more than one command.
    pub fn validate(&self) -> Result<()> {
        let arguments: Vec<&str> = match self {
            Self::Helo { hostname } | Self::Ehlo { hostname } => vec![hostname.as_str()],
            Self::Vrfy { address } | Self::Expn { address } => vec![address.as_str()],
            Self::MailFrom {
                sender: address,
                options,
            }
            | Self::RcptTo {
                recipient: address,
                options,
            } => std::iter::once(address.as_str())
                .chain(options.iter().map(String::as_str))
                .collect(),
            Self::Help | Self::Rset | Self::Noop | Self::Quit | Self::Data | Self::StartTls => {
                Vec::new()
            }
        };

        match arguments.iter().find(|arg| arg.contains(['\r', '\n'])) {
            Some(arg) => Err(Error::Configuration(format!(
                "Line break in {} argument: {arg:?}",
                self.kind().verb()
            ))),
            None => Ok(()),
        }
    }

    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(self.kind().verb().as_bytes());

        match self {
            Self::Helo { hostname } | Self::Ehlo { hostname } => {
                buf.push(b' ');
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::Vrfy { address } | Self::Expn { address } => {
                buf.push(b' ');
                buf.extend_from_slice(parse_address(address).as_bytes());
            }
            Self::MailFrom { sender, options } => {
                buf.extend_from_slice(b" FROM:");
                buf.extend_from_slice(quote_address(sender).as_bytes());
                push_options(&mut buf, options);
            }
            Self::RcptTo { recipient, options } => {
                buf.extend_from_slice(b" TO:");
                buf.extend_from_slice(quote_address(recipient).as_bytes());
                push_options(&mut buf, options);
            }
            Self::Help | Self::Rset | Self::Noop | Self::Quit | Self::Data | Self::StartTls => {}
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Checks a reply against this command's success codes.
    ///
    /// # Errors
    ///
    /// Returns the error variant for this command kind, carrying the reply
    /// code and message (and the address for MAIL and RCPT).
    pub fn check(&self, reply: Reply) -> Result<Reply> {
        if self.kind().accepts(reply.code) {
            return Ok(reply);
        }

        let code = reply.code.as_u16();
        Err(match self {
            Self::MailFrom { sender, .. } => Error::SenderRefused {
                code,
                message: reply.message,
                sender: sender.clone(),
            },
            Self::RcptTo { recipient, .. } => Error::RecipientRefused {
                code,
                message: reply.message,
                recipient: recipient.clone(),
            },
            _ => self.kind().reject(reply),
        })
    }
}

fn push_options(buf: &mut Vec<u8>, options: &[String]) {
    for option in options {
        buf.push(b' ');
        buf.extend_from_slice(option.as_bytes());
    }
}

/// Command kinds, including the message-body stage of DATA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// HELO
    Helo,
    /// EHLO
    Ehlo,
    /// HELP
    Help,
    /// RSET
    Rset,
    /// NOOP
    Noop,
    /// VRFY
    Vrfy,
    /// EXPN
    Expn,
    /// QUIT
    Quit,
    /// MAIL FROM
    Mail,
    /// RCPT TO
    Rcpt,
    /// DATA request, answered with 354
    Data,
    /// Message body and terminating `.` line
    DataEnd,
    /// STARTTLS
    StartTls,
}

impl CommandKind {
    /// Every command kind.
    pub const ALL: [Self; 13] = [
        Self::Helo,
        Self::Ehlo,
        Self::Help,
        Self::Rset,
        Self::Noop,
        Self::Vrfy,
        Self::Expn,
        Self::Quit,
        Self::Mail,
        Self::Rcpt,
        Self::Data,
        Self::DataEnd,
        Self::StartTls,
    ];

    /// Returns the command verb as sent on the wire.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Helo => "HELO",
            Self::Ehlo => "EHLO",
            Self::Help => "HELP",
            Self::Rset => "RSET",
            Self::Noop => "NOOP",
            Self::Vrfy => "VRFY",
            Self::Expn => "EXPN",
            Self::Quit => "QUIT",
            Self::Mail => "MAIL",
            Self::Rcpt => "RCPT",
            Self::Data | Self::DataEnd => "DATA",
            Self::StartTls => "STARTTLS",
        }
    }

    /// Reply codes that complete this command successfully.
    #[must_use]
    pub const fn success_codes(self) -> &'static [ReplyCode] {
        match self {
            Self::Helo
            | Self::Ehlo
            | Self::Rset
            | Self::Noop
            | Self::Expn
            | Self::Mail
            | Self::DataEnd => &[ReplyCode::OK],
            Self::Help => &[
                ReplyCode::SYSTEM_STATUS,
                ReplyCode::HELP_MESSAGE,
                ReplyCode::OK,
            ],
            Self::Vrfy => &[ReplyCode::OK, ReplyCode::FORWARD, ReplyCode::CANNOT_VERIFY],
            Self::Quit => &[ReplyCode::CLOSING],
            Self::Rcpt => &[ReplyCode::OK, ReplyCode::FORWARD],
            Self::Data => &[ReplyCode::START_DATA],
            Self::StartTls => &[ReplyCode::SERVICE_READY],
        }
    }

    /// Returns true if `code` completes this command successfully.
    #[must_use]
    pub fn accepts(self, code: ReplyCode) -> bool {
        self.success_codes().contains(&code)
    }

    /// Builds the error for an unexpected reply to this command kind.
    ///
    /// MAIL and RCPT errors built here carry an empty address; prefer
    /// [`Command::check`] when the command is at hand.
    #[must_use]
    pub fn reject(self, reply: Reply) -> Error {
        let code = reply.code.as_u16();
        let message = reply.message;
        match self {
            Self::Helo | Self::Ehlo => Error::Helo { code, message },
            Self::Data | Self::DataEnd => Error::Data { code, message },
            Self::Mail => Error::SenderRefused {
                code,
                message,
                sender: String::new(),
            },
            Self::Rcpt => Error::RecipientRefused {
                code,
                message,
                recipient: String::new(),
            },
            Self::Help
            | Self::Rset
            | Self::Noop
            | Self::Vrfy
            | Self::Expn
            | Self::Quit
            | Self::StartTls => Error::Response { code, message },
        }
    }

    /// Checks a reply against this kind's success codes.
    ///
    /// # Errors
    ///
    /// Returns [`CommandKind::reject`] for any other code.
    pub fn check(self, reply: Reply) -> Result<Reply> {
        if self.accepts(reply.code) {
            Ok(reply)
        } else {
            Err(self.reject(reply))
        }
    }
}
