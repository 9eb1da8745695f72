// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-shot timer contract for debounced rescans.
//!
//! The [`ScanScheduler`](crate::scan::ScanScheduler) never sleeps. It asks a
//! [`TimerHost`] to call back later and remembers the returned [`TimerId`];
//! when the host's callback fires it hands the id back through
//! [`ScanScheduler::on_timer`](crate::scan::ScanScheduler::on_timer).
//!
//! Browsers implement the host with `setTimeout`/`clearTimeout`.
//! [`ManualTimers`] is a deterministic queue driven by explicit
//! [`advance`](ManualTimers::advance) calls.

use alloc::vec::Vec;
use core::fmt;

use crate::scan::TriggerKind;
use crate::time::{Duration, HostTime};

/// Handle to a pending timer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u32);

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({})", self.0)
    }
}

/// Schedules and cancels one-shot callbacks.
pub trait TimerHost {
    /// Arms a timer that fires once after `delay`, on behalf of `kind`.
    ///
    /// Only [`TriggerKind::Mutation`] and [`TriggerKind::Scroll`] are
    /// debounced; hosts may panic in debug builds when given
    /// [`TriggerKind::Startup`].
    fn set_timeout(&mut self, kind: TriggerKind, delay: Duration) -> TimerId;

    /// Cancels a pending timer. Cancelling a fired or unknown timer is a
    /// no-op.
    fn clear_timeout(&mut self, id: TimerId);
}

/// A timer armed in a [`ManualTimers`] queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTimer {
    /// The timer's handle.
    pub id: TimerId,
    /// The trigger it was armed for.
    pub kind: TriggerKind,
    /// When it fires.
    pub deadline: HostTime,
}

/// A virtual-time [`TimerHost`].
///
/// Time only moves on [`advance`](Self::advance) or
/// [`advance_to`](Self::advance_to), which return the timers that came due,
/// in deadline order (ties by arming order).
#[derive(Debug, Default)]
pub struct ManualTimers {
    now: HostTime,
    next_id: u32,
    pending: Vec<PendingTimer>,
    cancelled: u32,
}

impl ManualTimers {
    /// Creates an empty queue at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.now
    }

    /// Returns the timers that have not fired or been cancelled.
    #[must_use]
    pub fn pending(&self) -> &[PendingTimer] {
        &self.pending
    }

    /// Returns how many timers have been cancelled before firing.
    #[must_use]
    pub fn cancelled(&self) -> u32 {
        self.cancelled
    }

    /// Moves time forward by `by` and returns the timers that fired.
    pub fn advance(&mut self, by: Duration) -> Vec<PendingTimer> {
        let target = self.now.saturating_add(by);
        self.advance_to(target)
    }

    /// Moves time forward to `target` and returns the timers that fired.
    ///
    /// # Panics
    ///
    /// Panics if `target` is earlier than [`now`](Self::now).
    pub fn advance_to(&mut self, target: HostTime) -> Vec<PendingTimer> {
        assert!(
            target >= self.now,
            "cannot move virtual time backwards ({:?} < {:?})",
            target,
            self.now
        );
        self.now = target;
        let mut fired: Vec<PendingTimer> = Vec::new();
        self.pending.retain(|timer| {
            if timer.deadline <= target {
                fired.push(*timer);
                false
            } else {
                true
            }
        });
        // Ids grow with arming order, so they break deadline ties.
        fired.sort_by_key(|timer| (timer.deadline, timer.id.0));
        fired
    }
}

impl TimerHost for ManualTimers {
    fn set_timeout(&mut self, kind: TriggerKind, delay: Duration) -> TimerId {
        debug_assert_ne!(kind, TriggerKind::Startup, "startup has no timer slot");
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingTimer {
            id,
            kind,
            deadline: self.now.saturating_add(delay),
        });
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.id != id);
        if self.pending.len() < before {
            self.cancelled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut timers = ManualTimers::new();
        let late = timers.set_timeout(TriggerKind::Scroll, Duration(200));
        let early = timers.set_timeout(TriggerKind::Mutation, Duration(100));

        assert!(timers.advance(Duration(99)).is_empty());
        let fired = timers.advance(Duration(200));
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].id, early);
        assert_eq!(fired[1].id, late);
        assert_eq!(timers.now(), HostTime(299));
        assert!(timers.pending().is_empty());
    }

    #[test]
    fn cleared_timer_never_fires() {
        let mut timers = ManualTimers::new();
        let id = timers.set_timeout(TriggerKind::Mutation, Duration(100));
        timers.clear_timeout(id);
        timers.clear_timeout(id);
        assert_eq!(timers.cancelled(), 1, "second clear is a no-op");
        assert!(timers.advance(Duration(1_000)).is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "startup has no timer slot")]
    fn startup_is_never_armed() {
        let mut timers = ManualTimers::new();
        let _ = timers.set_timeout(TriggerKind::Startup, Duration(100));
    }

    #[test]
    #[should_panic(expected = "cannot move virtual time backwards")]
    fn time_is_monotonic() {
        let mut timers = ManualTimers::new();
        let _ = timers.advance(Duration(10));
        let _ = timers.advance_to(HostTime(5));
    }
}
