//! Serial command types.
//!
//! Decoded from the inbound byte stream by the control unit's command
//! decoder and handed to the poll loop through mailboxes.

use static_assertions::const_assert_eq;

/// Manual override intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum JogIntent {
    /// No manual override (byte `0x00`).
    #[default]
    Stop = 0,
    /// Jog upwards (byte `0x01`).
    Up = 1,
    /// Jog downwards (byte `0x02`).
    Down = 2,
}

impl JogIntent {
    /// Decode a single jog byte.
    #[inline]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Stop),
            0x01 => Some(Self::Up),
            0x02 => Some(Self::Down),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether the intent overrides the automatic drive.
    #[inline]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Stop)
    }
}

const_assert_eq!(core::mem::size_of::<JogIntent>(), 1);

/// A decoded serial command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `$LIFTER:<delta>#`: move by `delta` mm relative to the current position.
    HeightAdjust(f32),
    /// `0x0F b0 b1 b2 0x1F`: move to an absolute position [mm].
    AbsoluteTarget(u16),
    /// `0x00` / `0x01` / `0x02`: manual override.
    Jog(JogIntent),
}

/// Start byte of the absolute-position frame.
pub const ABSOLUTE_FRAME_START: u8 = 0x0F;

/// End byte of the absolute-position frame.
pub const ABSOLUTE_FRAME_END: u8 = 0x1F;

/// Start of a text frame.
pub const TEXT_FRAME_START: u8 = b'$';

/// End of a text frame.
pub const TEXT_FRAME_END: u8 = b'#';

/// Encode a relative height adjustment frame.
pub fn height_adjust_frame(delta_mm: f32) -> String {
    format!("$LIFTER:{delta_mm}#")
}

/// Encode an absolute-position frame. Returns `None` above 999 mm.
pub fn absolute_target_frame(target_mm: u16) -> Option<[u8; 5]> {
    if target_mm > 999 {
        return None;
    }
    let b0 = (target_mm / 100) as u8;
    let b1 = (target_mm / 10 % 10) as u8;
    let b2 = (target_mm % 10) as u8;
    Some([ABSOLUTE_FRAME_START, b0, b1, b2, ABSOLUTE_FRAME_END])
}
