//! Fixed-interval timer set.
//!
//! The main loop polls the scheduler once per iteration with the current
//! monotonic time. Every timer whose period has elapsed since it last
//! fired is reported to a [`SchedulerDelegate`], in the order the timers
//! were added.
//!
//! ```text
//!   clock.now_ms() ──▶ Scheduler::poll ──▶ delegate.on_timer(id)
//!                           │
//!        ┌──────────────────┼──────────────────┐
//!        ▼                  ▼                  ▼
//!    Heartbeat          ControlTick       StatusReport
//!    (LED toggle)       (loop adjust)     (line to master)
//! ```
//!
//! The scheduler holds no clock of its own, so tests drive it with plain
//! numbers.

use log::info;

use crate::app::ports::{SchedulerDelegate, TimerId};

/// Maximum number of timers (stack-allocated).
const MAX_TIMERS: usize = 4;

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    id: TimerId,
    period_ms: u64,
    last_fired_ms: u64,
}

pub struct Scheduler {
    timers: [Option<TimerEntry>; MAX_TIMERS],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            timers: [None; MAX_TIMERS],
        }
    }

    /// Add a timer that first fires `period_ms` after `now_ms`.
    /// Returns the slot index, or `None` if full.
    pub fn add(&mut self, id: TimerId, period_ms: u32, now_ms: u64) -> Option<usize> {
        let (i, slot) = self
            .timers
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())?;
        info!("Scheduler: {:?} every {} ms (slot {})", id, period_ms, i);
        *slot = Some(TimerEntry {
            id,
            period_ms: u64::from(period_ms),
            last_fired_ms: now_ms,
        });
        Some(i)
    }

    /// Fire every due timer once.
    ///
    /// A timer that fell several periods behind fires a single time and
    /// re-arms from `now_ms`; missed periods are not replayed.
    pub fn poll(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        for entry in self.timers.iter_mut().flatten() {
            if now_ms.saturating_sub(entry.last_fired_ms) >= entry.period_ms {
                entry.last_fired_ms = now_ms;
                delegate.on_timer(entry.id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.timers.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
