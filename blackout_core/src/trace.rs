// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the scan loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! hosts call as they drive a [`ScanScheduler`](crate::scan::ScanScheduler).
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Events are built from the values the scheduler already returns
//! ([`ScanReport`], [`ScheduleOutcome`], [`ClickOutcome`]) plus a host
//! timestamp.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use crate::conceal::{ClickOutcome, RevealTarget};
use crate::scan::{ScanReport, ScheduleOutcome, TriggerKind};
use crate::time::{Duration, HostTime};
use crate::timer::TimerId;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted once the scheduler is attached and the startup pass has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachEvent {
    /// Host time of the attach.
    pub at: HostTime,
    /// Result of the startup pass.
    pub startup: ScanReport,
}

/// Emitted for every observed mutation batch, relevant or not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutationBatchEvent {
    /// Host time the batch was delivered.
    pub at: HostTime,
    /// Number of records in the batch.
    pub records: u32,
    /// Number of added nodes across the batch.
    pub added_nodes: u32,
    /// Whether the batch armed a rescan.
    pub relevant: bool,
}

/// Emitted when a debounce timer is armed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RescanScheduledEvent {
    /// Host time the timer was armed.
    pub at: HostTime,
    /// Which slot was armed.
    pub trigger: TriggerKind,
    /// The new timer.
    pub timer: TimerId,
    /// The cancelled predecessor, if any.
    pub superseded: Option<TimerId>,
    /// Delay until the timer fires.
    pub delay: Duration,
}

impl RescanScheduledEvent {
    /// Creates an event from a [`ScheduleOutcome`].
    #[must_use]
    pub fn new(outcome: &ScheduleOutcome, at: HostTime) -> Self {
        Self {
            at,
            trigger: outcome.trigger,
            timer: outcome.timer,
            superseded: outcome.superseded,
            delay: outcome.delay,
        }
    }

    /// Returns the time the timer is due.
    #[must_use]
    pub fn due(&self) -> HostTime {
        self.at + self.delay
    }
}

/// Emitted after every scan pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanPassEvent {
    /// Host time the pass started.
    pub at: HostTime,
    /// How long the pass took, if the host measured it.
    pub elapsed: Option<Duration>,
    /// Running pass counter (1 for the startup pass).
    pub pass_index: u64,
    /// Counters for the pass.
    pub report: ScanReport,
}

impl ScanPassEvent {
    /// Creates an event from a [`ScanReport`].
    #[must_use]
    pub fn new(report: &ScanReport, pass_index: u64, at: HostTime) -> Self {
        Self {
            at,
            elapsed: None,
            pass_index,
            report: *report,
        }
    }

    /// Sets the measured duration.
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }
}

/// Emitted when a click reveals an element or an overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevealEvent {
    /// Host time of the click.
    pub at: HostTime,
    /// What was revealed.
    pub target: RevealTarget,
}

impl RevealEvent {
    /// Creates an event for a click that performed a reveal, or `None` for
    /// one that did not.
    #[must_use]
    pub fn from_click(outcome: &ClickOutcome, at: HostTime) -> Option<Self> {
        outcome.revealed.map(|target| Self { at, target })
    }
}

/// Emitted when the scheduler is detached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetachEvent {
    /// Host time of the detach.
    pub at: HostTime,
    /// Number of armed timers that were cancelled.
    pub cancelled_timers: u32,
    /// Total passes run while attached.
    pub passes: u64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the scan loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after attach.
    fn on_attach(&mut self, e: &AttachEvent) {
        _ = e;
    }

    /// Called for every mutation batch.
    fn on_mutation_batch(&mut self, e: &MutationBatchEvent) {
        _ = e;
    }

    /// Called when a debounce timer is armed.
    fn on_rescan_scheduled(&mut self, e: &RescanScheduledEvent) {
        _ = e;
    }

    /// Called after each scan pass.
    fn on_scan_pass(&mut self, e: &ScanPassEvent) {
        _ = e;
    }

    /// Called when a click reveals something.
    fn on_reveal(&mut self, e: &RevealEvent) {
        _ = e;
    }

    /// Called on detach.
    fn on_detach(&mut self, e: &DetachEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits an [`AttachEvent`].
    #[inline]
    pub fn attach(&mut self, e: &AttachEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_attach(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`MutationBatchEvent`].
    #[inline]
    pub fn mutation_batch(&mut self, e: &MutationBatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_mutation_batch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RescanScheduledEvent`].
    #[inline]
    pub fn rescan_scheduled(&mut self, e: &RescanScheduledEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_rescan_scheduled(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ScanPassEvent`].
    #[inline]
    pub fn scan_pass(&mut self, e: &ScanPassEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_scan_pass(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RevealEvent`].
    #[inline]
    pub fn reveal(&mut self, e: &RevealEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_reveal(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DetachEvent`].
    #[inline]
    pub fn detach(&mut self, e: &DetachEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_detach(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
