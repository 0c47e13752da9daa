//! Core SMTP types.

mod address;
mod extension;
mod reply;

pub use address::{parse_address, quote_address};
pub use extension::{AuthMechanism, AuthMethods, Extensions};
pub use reply::{Reply, ReplyCode};
