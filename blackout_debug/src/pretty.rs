// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Times are
//! host milliseconds.

use std::io::Write;

use blackout_core::conceal::RevealTarget;
use blackout_core::scan::{ScanReport, TriggerKind};
use blackout_core::trace::{
    AttachEvent, DetachEvent, MutationBatchEvent, RescanScheduledEvent, RevealEvent,
    ScanPassEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn trigger_name(trigger: TriggerKind) -> &'static str {
    match trigger {
        TriggerKind::Startup => "startup",
        TriggerKind::Mutation => "mutation",
        TriggerKind::Scroll => "scroll",
    }
}

fn counters(r: &ScanReport) -> String {
    format!(
        "candidates={} included={} concealed={} overlays={} skipped={}",
        r.candidates, r.included, r.concealed, r.overlays, r.skipped,
    )
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_attach(&mut self, e: &AttachEvent) {
        let _ = writeln!(
            self.writer,
            "[attach] at {}ms {}",
            e.at.millis(),
            counters(&e.startup),
        );
    }

    fn on_mutation_batch(&mut self, e: &MutationBatchEvent) {
        let relevant = if e.relevant { "relevant" } else { "ignored" };
        let _ = writeln!(
            self.writer,
            "[mutations] at {}ms records={} added={} {relevant}",
            e.at.millis(),
            e.records,
            e.added_nodes,
        );
    }

    fn on_rescan_scheduled(&mut self, e: &RescanScheduledEvent) {
        let replaced = match e.superseded {
            Some(old) => format!(" replaces timer {}", old.0),
            None => String::new(),
        };
        let _ = writeln!(
            self.writer,
            "[schedule] {} timer {} due {}ms{replaced}",
            trigger_name(e.trigger),
            e.timer.0,
            e.due().millis(),
        );
    }

    fn on_scan_pass(&mut self, e: &ScanPassEvent) {
        let elapsed = match e.elapsed {
            Some(d) => format!(" in {}ms", d.millis()),
            None => String::new(),
        };
        let _ = writeln!(
            self.writer,
            "[pass] #{} {} at {}ms {}{elapsed}",
            e.pass_index,
            trigger_name(e.report.trigger),
            e.at.millis(),
            counters(&e.report),
        );
    }

    fn on_reveal(&mut self, e: &RevealEvent) {
        let what = match e.target {
            RevealTarget::Media => "media",
            RevealTarget::Overlay => "video overlay",
        };
        let _ = writeln!(self.writer, "[reveal] {what} at {}ms", e.at.millis());
    }

    fn on_detach(&mut self, e: &DetachEvent) {
        let _ = writeln!(
            self.writer,
            "[detach] at {}ms after {} passes, cancelled {} timers",
            e.at.millis(),
            e.passes,
            e.cancelled_timers,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackout_core::time::{Duration, HostTime};
    use blackout_core::timer::TimerId;

    fn lines(sink: PrettyPrintSink<Vec<u8>>) -> Vec<String> {
        String::from_utf8(sink.into_inner())
            .expect("sink writes UTF-8")
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn one_line_per_event() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        let mut report = ScanReport::new(TriggerKind::Mutation);
        report.candidates = 5;
        report.included = 2;
        report.concealed = 1;

        sink.on_mutation_batch(&MutationBatchEvent {
            at: HostTime(10),
            records: 3,
            added_nodes: 4,
            relevant: true,
        });
        sink.on_rescan_scheduled(&RescanScheduledEvent {
            at: HostTime(10),
            trigger: TriggerKind::Mutation,
            timer: TimerId(2),
            superseded: Some(TimerId(1)),
            delay: Duration(100),
        });
        sink.on_scan_pass(
            &ScanPassEvent::new(&report, 2, HostTime(110)).with_elapsed(Duration(1)),
        );

        assert_eq!(
            lines(sink),
            [
                "[mutations] at 10ms records=3 added=4 relevant",
                "[schedule] mutation timer 2 due 110ms replaces timer 1",
                "[pass] #2 mutation at 110ms candidates=5 included=2 concealed=1 \
                 overlays=0 skipped=0 in 1ms",
            ]
        );
    }

    #[test]
    fn reveal_and_detach_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        sink.on_reveal(&RevealEvent {
            at: HostTime(7),
            target: RevealTarget::Overlay,
        });
        sink.on_detach(&DetachEvent {
            at: HostTime(9),
            cancelled_timers: 2,
            passes: 4,
        });
        assert_eq!(
            lines(sink),
            [
                "[reveal] video overlay at 7ms",
                "[detach] at 9ms after 4 passes, cancelled 2 timers",
            ]
        );
    }
}
