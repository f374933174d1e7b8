//! World tick counter.
//!
//! The counter is the single source of truth for "which tick is this". It
//! is advanced only by the tick scheduler (timer firings and forced ticks)
//! and can be read from anywhere without locking.

use std::sync::atomic::{AtomicU64, Ordering};

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Monotonic world tick counter, starting at 0 before the first tick.
#[derive(Debug, Default)]
pub struct TickClock {
    tick: AtomicU64,
}

impl TickClock {
    /// Create a clock at tick 0.
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a clock resuming from a known tick.
    pub const fn starting_at(tick: u64) -> Self {
        Self {
            tick: AtomicU64::new(tick),
        }
    }

    /// Advance by one tick. Returns the new tick number.
    pub fn advance(&self) -> Result<u64, ClockError> {
        self.tick
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_add(1))
            .map_err(|_current| ClockError::TickOverflow)
            .and_then(|previous| previous.checked_add(1).ok_or(ClockError::TickOverflow))
    }

    /// The most recently started tick.
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }
}

/// Whether `tick` falls on an `every`-tick boundary. A zero period is never
/// due.
pub const fn is_due(tick: u64, every: u64) -> bool {
    matches!(tick.checked_rem(every), Some(0)) && tick > 0
}
