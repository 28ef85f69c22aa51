//! Byte-at-a-time serial command decoder.
//!
//! Three framings share one byte stream:
//! - text `"$LIFTER:" <float> "#"`: `$` restarts the buffer, `#` ends it,
//! - binary `0x0F b0 b1 b2 0x1F`: decimal digits of an absolute target,
//! - single jog bytes `0x00`/`0x01`/`0x02` outside a binary frame.
//!
//! Every byte is offered to both the text buffer and the binary framer.

use heapless::Vec as HVec;
use lift_common::consts::{LIFTER_FRAME_PREFIX, RX_BUFFER_SIZE};
use lift_common::protocol::{
    ABSOLUTE_FRAME_END, ABSOLUTE_FRAME_START, Command, JogIntent, TEXT_FRAME_END,
    TEXT_FRAME_START,
};
use tracing::{debug, warn};

/// Binary frame progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BinaryState {
    #[default]
    Idle,
    /// Start byte seen; `len` digits collected so far.
    Digits { value: u16, len: u8 },
    /// Three digits collected.
    AwaitTrailer { value: u16 },
}

/// Serial command decoder.
#[derive(Debug, Clone, Default)]
pub struct CommandDecoder {
    text: HVec<u8, RX_BUFFER_SIZE>,
    binary: BinaryState,
}

impl CommandDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a binary frame is in progress.
    #[inline]
    pub fn in_binary_frame(&self) -> bool {
        self.binary != BinaryState::Idle
    }

    /// Feed one byte; returns a command when the byte completes one.
    pub fn push(&mut self, byte: u8) -> Option<Command> {
        let text = self.push_text(byte);
        let binary = self.push_binary(byte);
        text.or(binary)
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.text.clear();
        self.binary = BinaryState::Idle;
    }

    fn push_text(&mut self, byte: u8) -> Option<Command> {
        if byte == TEXT_FRAME_START {
            self.text.clear();
        }
        // Overflowing bytes are dropped; the frame then fails to parse.
        let _ = self.text.push(byte);

        if byte != TEXT_FRAME_END {
            return None;
        }

        let command = parse_text_frame(&self.text);
        self.text.clear();
        command
    }

    fn push_binary(&mut self, byte: u8) -> Option<Command> {
        match self.binary {
            BinaryState::Idle => self.idle_byte(byte),
            BinaryState::Digits { value, len } => {
                if byte > 9 {
                    warn!(byte, "absolute frame digit out of range, frame dropped");
                    self.binary = BinaryState::Idle;
                    return self.idle_byte(byte);
                }
                let value = value * 10 + u16::from(byte);
                self.binary = if len + 1 == 3 {
                    BinaryState::AwaitTrailer { value }
                } else {
                    BinaryState::Digits { value, len: len + 1 }
                };
                None
            }
            BinaryState::AwaitTrailer { value } => {
                self.binary = BinaryState::Idle;
                if byte == ABSOLUTE_FRAME_END {
                    debug!(value, "absolute frame decoded");
                    return Some(Command::AbsoluteTarget(value));
                }
                warn!(byte, "absolute frame missing trailer, frame dropped");
                self.idle_byte(byte)
            }
        }
    }

    fn idle_byte(&mut self, byte: u8) -> Option<Command> {
        if byte == ABSOLUTE_FRAME_START {
            self.binary = BinaryState::Digits { value: 0, len: 0 };
            return None;
        }
        JogIntent::from_byte(byte).map(Command::Jog)
    }
}

/// Parse a complete `$LIFTER:<float>#` buffer.
fn parse_text_frame(frame: &[u8]) -> Option<Command> {
    let Some(body) = frame
        .strip_prefix(LIFTER_FRAME_PREFIX)
        .and_then(|rest| rest.strip_suffix(&[TEXT_FRAME_END]))
    else {
        debug!(len = frame.len(), "text frame without lifter prefix discarded");
        return None;
    };

    let parsed = core::str::from_utf8(body)
        .ok()
        .and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite());

    match parsed {
        Some(delta) => Some(Command::HeightAdjust(delta)),
        None => {
            debug!(
                body = %String::from_utf8_lossy(body),
                "unparsable lifter frame discarded"
            );
            None
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
