//! Frame-coalescing primitives for pointer-driven updates.
//!
//! Pointer moves arrive faster than the display repaints. Hosts push every
//! move into a [`FrameSlot`] and drain it once per repaint tick; only the
//! newest value survives. Hosts without a native repaint callback can gate
//! ticks on a monotonic clock with [`TickGate`].

/// A single-slot pending update buffer with schedule-replace semantics.
#[derive(Debug, Clone)]
pub struct FrameSlot<T> {
    pending: Option<T>,
    superseded: u64,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self {
            pending: None,
            superseded: 0,
        }
    }
}

impl<T> FrameSlot<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a value for the next tick, replacing anything still pending.
    pub fn schedule(&mut self, value: T) {
        if self.pending.replace(value).is_some() {
            self.superseded += 1;
        }
    }

    /// Take the pending value, leaving the slot empty.
    pub fn drain(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Drop the pending value without applying it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Whether a value is waiting for the next tick.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Peek at the pending value.
    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Number of scheduled values that were replaced before being drained.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}

/// Repaint tick gate driven by a monotonic nanosecond clock.
#[derive(Debug)]
pub struct TickGate {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl TickGate {
    /// Create a gate targeting the given refresh rate in Hz.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}
