//! Lock-free single-producer/single-consumer handoff to the poll loop.
//!
//! Each mailbox has exactly one producer (ticker or serial receiver) and one
//! consumer (the poll loop). The producer stores the payload, then raises
//! the ready flag with `Release`; the consumer observes the flag with
//! `Acquire`, copies the payload, then clears the flag.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use lift_common::protocol::JogIntent;
use static_assertions::const_assert;

/// Values that round-trip through a 32-bit atomic.
pub trait Payload: Copy {
    fn to_bits(self) -> u32;
    fn from_bits(bits: u32) -> Self;
}

impl Payload for f32 {
    #[inline]
    fn to_bits(self) -> u32 {
        f32::to_bits(self)
    }
    #[inline]
    fn from_bits(bits: u32) -> Self {
        f32::from_bits(bits)
    }
}

impl Payload for u16 {
    #[inline]
    fn to_bits(self) -> u32 {
        u32::from(self)
    }
    #[inline]
    fn from_bits(bits: u32) -> Self {
        bits as u16
    }
}

const_assert!(core::mem::size_of::<f32>() <= core::mem::size_of::<AtomicU32>());
const_assert!(core::mem::size_of::<u16>() <= core::mem::size_of::<AtomicU32>());

/// One-shot flag, e.g. the tick-ready signal.
#[derive(Debug, Default)]
pub struct TickFlag {
    raised: AtomicBool,
}

impl TickFlag {
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Consume the flag. Returns whether it was raised.
    #[inline]
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// Payload plus ready flag.
///
/// Publishing again before the consumer took the value overwrites it.
#[derive(Debug)]
pub struct Mailbox<T: Payload> {
    bits: AtomicU32,
    ready: AtomicBool,
    _payload: core::marker::PhantomData<T>,
}

impl<T: Payload> Mailbox<T> {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            ready: AtomicBool::new(false),
            _payload: core::marker::PhantomData,
        }
    }

    /// Producer side.
    #[inline]
    pub fn publish(&self, value: T) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
        self.ready.store(true, Ordering::Release);
    }

    /// Consumer side: the value, if one was published since the last take.
    ///
    /// The flag is lowered before the payload is read, so a publish racing
    /// with the read raises it again and is picked up by the next take.
    #[inline]
    pub fn take(&self) -> Option<T> {
        if !self.ready.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(T::from_bits(self.bits.load(Ordering::Relaxed)))
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

impl<T: Payload> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Level-triggered manual jog intent.
#[derive(Debug, Default)]
pub struct JogMailbox {
    level: AtomicU8,
}

impl JogMailbox {
    pub const fn new() -> Self {
        Self {
            level: AtomicU8::new(JogIntent::Stop as u8),
        }
    }

    #[inline]
    pub fn set(&self, intent: JogIntent) {
        self.level.store(intent.as_byte(), Ordering::Release);
    }

    #[inline]
    pub fn current(&self) -> JogIntent {
        JogIntent::from_byte(self.level.load(Ordering::Acquire)).unwrap_or_default()
    }
}

/// Every mailbox the poll loop reads.
#[derive(Debug, Default)]
pub struct Mailboxes {
    /// Raised by the ticker once per period.
    pub tick: TickFlag,
    /// Relative height adjustment [mm].
    pub height_delta: Mailbox<f32>,
    /// Absolute target [mm].
    pub absolute_target: Mailbox<u16>,
    /// Manual override.
    pub jog: JogMailbox,
}

impl Mailboxes {
    pub const fn new() -> Self {
        Self {
            tick: TickFlag::new(),
            height_delta: Mailbox::new(),
            absolute_target: Mailbox::new(),
            jog: JogMailbox::new(),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
