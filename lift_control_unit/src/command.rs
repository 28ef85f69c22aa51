//! Serial command intake.
//!
//! Bytes are decoded by [`decoder::CommandDecoder`] and handed to the poll
//! loop through the lock-free [`mailbox::Mailboxes`] by
//! [`receiver::SerialReceiver`].

pub mod decoder;
pub mod mailbox;
pub mod receiver;

pub use decoder::CommandDecoder;
pub use mailbox::{JogMailbox, Mailbox, Mailboxes, TickFlag};
pub use receiver::SerialReceiver;
