//! Serial receive path: decoder plus mailbox publication.
//!
//! The receiver is the only producer of the command mailboxes. On target
//! hardware it runs from the UART interrupt; on the host it runs on a reader
//! thread.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lift_common::protocol::Command;
use tracing::{debug, info};

use super::decoder::CommandDecoder;
use super::mailbox::Mailboxes;

pub struct SerialReceiver {
    decoder: CommandDecoder,
    mailboxes: Arc<Mailboxes>,
}

impl SerialReceiver {
    pub fn new(mailboxes: Arc<Mailboxes>) -> Self {
        Self {
            decoder: CommandDecoder::new(),
            mailboxes,
        }
    }

    /// Decode one byte and publish the command it completes, if any.
    pub fn on_byte(&mut self, byte: u8) -> Option<Command> {
        let command = self.decoder.push(byte)?;
        match command {
            Command::HeightAdjust(delta) => {
                info!("Recv LIFTER Δh = {delta:.2}");
                self.mailboxes.height_delta.publish(delta);
            }
            Command::AbsoluteTarget(target) => {
                info!("Target pos = {target}");
                self.mailboxes.absolute_target.publish(target);
            }
            Command::Jog(intent) => {
                info!(?intent, "jog");
                self.mailboxes.jog.set(intent);
            }
        }
        Some(command)
    }

    /// Feed a byte slice. Returns the number of commands published.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter_map(|&b| self.on_byte(b)).count()
    }

    /// Pump bytes from `reader` until EOF or until `running` is cleared.
    pub fn pump<R: Read>(&mut self, mut reader: R, running: &AtomicBool) -> io::Result<()> {
        let mut buf = [0u8; 64];
        while running.load(Ordering::SeqCst) {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.feed(&buf[..n]);
        }
        debug!("serial input closed");
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
