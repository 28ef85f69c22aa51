//! Monotonic time source with wraparound-safe timeout checks.
//!
//! Tick counters are free-running `u32` values (1 ms and 1 µs resolution)
//! that wrap after `u32::MAX`. All comparisons go through [`is_timeout`], which
//! stays correct across a single wrap.

use std::cell::Cell;
use std::time::Instant;

/// Millisecond tick count.
pub type Millis = u32;

/// Microsecond tick count.
pub type Micros = u32;

/// Returns true once `timeout` ticks have elapsed since `start`.
///
/// `now < start` means the counter wrapped; the elapsed count is then
/// `(u32::MAX - start) + now + 1`.
#[inline]
pub const fn is_timeout(start: u32, now: u32, timeout: u32) -> bool {
    if now >= start {
        now - start >= timeout
    } else {
        (u32::MAX - start) + now + 1 >= timeout
    }
}

/// A monotonic clock.
pub trait Clock {
    /// Milliseconds since an arbitrary origin (wrapping).
    fn now_ms(&self) -> Millis;

    /// Microseconds since an arbitrary origin (wrapping).
    fn now_us(&self) -> Micros;

    /// Whether `timeout_ms` elapsed since `start`.
    #[inline]
    fn ms_timeout(&self, start: Millis, timeout_ms: Millis) -> bool {
        is_timeout(start, self.now_ms(), timeout_ms)
    }

    /// Whether `timeout_us` elapsed since `start`.
    #[inline]
    fn us_timeout(&self, start: Micros, timeout_us: Micros) -> bool {
        is_timeout(start, self.now_us(), timeout_us)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }

    fn now_us(&self) -> Micros {
        (**self).now_us()
    }
}

/// Host clock backed by [`Instant`], truncated to wrapping `u32` ticks.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }

    fn now_us(&self) -> Micros {
        self.origin.elapsed().as_micros() as Micros
    }
}

/// Manually advanced clock for simulation and tests.
///
/// The microsecond counter is kept independently so wrap behaviour of each
/// counter can be exercised on its own.
#[derive(Debug, Default)]
pub struct ManualClock {
    ms: Cell<Millis>,
    us: Cell<Micros>,
}

impl ManualClock {
    pub fn new(start_ms: Millis) -> Self {
        Self {
            ms: Cell::new(start_ms),
            us: Cell::new(start_ms.wrapping_mul(1000)),
        }
    }

    /// Advance both counters by `ms` milliseconds (wrapping).
    pub fn advance_ms(&self, ms: Millis) {
        self.ms.set(self.ms.get().wrapping_add(ms));
        self.us.set(self.us.get().wrapping_add(ms.wrapping_mul(1000)));
    }

    /// Advance only the microsecond counter.
    pub fn advance_us(&self, us: Micros) {
        self.us.set(self.us.get().wrapping_add(us));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.ms.get()
    }

    fn now_us(&self) -> Micros {
        self.us.get()
    }
}

/// Non-blocking interval delay.
///
/// The first poll arms the delay and returns `false`. Later polls return
/// `true` exactly once when the interval has elapsed, then disarm so the next
/// poll re-arms it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonBlockingDelay {
    start: Option<u32>,
}

impl NonBlockingDelay {
    pub const fn new() -> Self {
        Self { start: None }
    }

    /// Whether the delay is currently armed.
    #[inline]
    pub const fn is_armed(&self) -> bool {
        self.start.is_some()
    }

    /// Poll against the millisecond counter.
    pub fn poll_ms<C: Clock>(&mut self, clock: &C, interval_ms: Millis) -> bool {
        self.poll(clock.now_ms(), interval_ms)
    }

    /// Poll against the microsecond counter.
    pub fn poll_us<C: Clock>(&mut self, clock: &C, interval_us: Micros) -> bool {
        self.poll(clock.now_us(), interval_us)
    }

    fn poll(&mut self, now: u32, interval: u32) -> bool {
        match self.start {
            None => {
                self.start = Some(now);
                false
            }
            Some(start) if is_timeout(start, now, interval) => {
                self.start = None;
                true
            }
            Some(_) => false,
        }
    }
}

/// Busy-wait for `ms` milliseconds.
pub fn block_ms<C: Clock>(clock: &C, ms: Millis) {
    let start = clock.now_ms();
    while !clock.ms_timeout(start, ms) {
        std::hint::spin_loop();
    }
}

/// Busy-wait for `us` microseconds.
pub fn block_us<C: Clock>(clock: &C, us: Micros) {
    let start = clock.now_us();
    while !clock.us_timeout(start, us) {
        std::hint::spin_loop();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
