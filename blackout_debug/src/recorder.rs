// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, one tag byte followed by
//! the event's fields. [`decode`] reads them back as an iterator of
//! [`RecordedEvent`]. A truncated or unknown record ends the iteration.

use blackout_core::conceal::RevealTarget;
use blackout_core::scan::{ScanReport, TriggerKind};
use blackout_core::time::{Duration, HostTime};
use blackout_core::timer::TimerId;
use blackout_core::trace::{
    AttachEvent, DetachEvent, MutationBatchEvent, RescanScheduledEvent, RevealEvent,
    ScanPassEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_ATTACH: u8 = 1;
const TAG_MUTATION_BATCH: u8 = 2;
const TAG_RESCAN_SCHEDULED: u8 = 3;
const TAG_SCAN_PASS: u8 = 4;
const TAG_REVEAL: u8 = 5;
const TAG_DETACH: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_option_u32(&mut self, v: Option<u32>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_u32(val);
            }
            None => {
                self.write_u8(0);
                self.write_u32(0);
            }
        }
    }

    fn write_option_u64(&mut self, v: Option<u64>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_u64(val);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_trigger(&mut self, t: TriggerKind) {
        self.write_u8(match t {
            TriggerKind::Startup => 0,
            TriggerKind::Mutation => 1,
            TriggerKind::Scroll => 2,
        });
    }

    fn write_report(&mut self, r: &ScanReport) {
        self.write_trigger(r.trigger);
        self.write_u32(r.candidates);
        self.write_u32(r.included);
        self.write_u32(r.concealed);
        self.write_u32(r.overlays);
        self.write_u32(r.skipped);
    }
}

impl TraceSink for RecorderSink {
    fn on_attach(&mut self, e: &AttachEvent) {
        self.write_u8(TAG_ATTACH);
        self.write_u64(e.at.millis());
        self.write_report(&e.startup);
    }

    fn on_mutation_batch(&mut self, e: &MutationBatchEvent) {
        self.write_u8(TAG_MUTATION_BATCH);
        self.write_u64(e.at.millis());
        self.write_u32(e.records);
        self.write_u32(e.added_nodes);
        self.write_u8(u8::from(e.relevant));
    }

    fn on_rescan_scheduled(&mut self, e: &RescanScheduledEvent) {
        self.write_u8(TAG_RESCAN_SCHEDULED);
        self.write_u64(e.at.millis());
        self.write_trigger(e.trigger);
        self.write_u32(e.timer.0);
        self.write_option_u32(e.superseded.map(|t| t.0));
        self.write_u64(e.delay.millis());
    }

    fn on_scan_pass(&mut self, e: &ScanPassEvent) {
        self.write_u8(TAG_SCAN_PASS);
        self.write_u64(e.at.millis());
        self.write_option_u64(e.elapsed.map(Duration::millis));
        self.write_u64(e.pass_index);
        self.write_report(&e.report);
    }

    fn on_reveal(&mut self, e: &RevealEvent) {
        self.write_u8(TAG_REVEAL);
        self.write_u64(e.at.millis());
        self.write_u8(match e.target {
            RevealTarget::Media => 0,
            RevealTarget::Overlay => 1,
        });
    }

    fn on_detach(&mut self, e: &DetachEvent) {
        self.write_u8(TAG_DETACH);
        self.write_u64(e.at.millis());
        self.write_u32(e.cancelled_timers);
        self.write_u64(e.passes);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// An [`AttachEvent`].
    Attach(AttachEvent),
    /// A [`MutationBatchEvent`].
    MutationBatch(MutationBatchEvent),
    /// A [`RescanScheduledEvent`].
    RescanScheduled(RescanScheduledEvent),
    /// A [`ScanPassEvent`].
    ScanPass(ScanPassEvent),
    /// A [`RevealEvent`].
    Reveal(RevealEvent),
    /// A [`DetachEvent`].
    Detach(DetachEvent),
}

impl RecordedEvent {
    /// Returns the host time the event was stamped with.
    #[must_use]
    pub fn at(&self) -> HostTime {
        match self {
            Self::Attach(e) => e.at,
            Self::MutationBatch(e) => e.at,
            Self::RescanScheduled(e) => e.at,
            Self::ScanPass(e) => e.at,
            Self::Reveal(e) => e.at,
            Self::Detach(e) => e.at,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_option_u32(&mut self) -> Option<Option<u32>> {
        let present = self.read_u8()?;
        let val = self.read_u32()?;
        Some(if present != 0 { Some(val) } else { None })
    }

    fn read_option_u64(&mut self) -> Option<Option<u64>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some(if present != 0 { Some(val) } else { None })
    }

    fn read_trigger(&mut self) -> Option<TriggerKind> {
        Some(match self.read_u8()? {
            0 => TriggerKind::Startup,
            1 => TriggerKind::Mutation,
            _ => TriggerKind::Scroll,
        })
    }

    fn read_report(&mut self) -> Option<ScanReport> {
        Some(ScanReport {
            trigger: self.read_trigger()?,
            candidates: self.read_u32()?,
            included: self.read_u32()?,
            concealed: self.read_u32()?,
            overlays: self.read_u32()?,
            skipped: self.read_u32()?,
        })
    }

    fn decode_attach(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Attach(AttachEvent {
            at: HostTime(self.read_u64()?),
            startup: self.read_report()?,
        }))
    }

    fn decode_mutation_batch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::MutationBatch(MutationBatchEvent {
            at: HostTime(self.read_u64()?),
            records: self.read_u32()?,
            added_nodes: self.read_u32()?,
            relevant: self.read_u8()? != 0,
        }))
    }

    fn decode_rescan_scheduled(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RescanScheduled(RescanScheduledEvent {
            at: HostTime(self.read_u64()?),
            trigger: self.read_trigger()?,
            timer: TimerId(self.read_u32()?),
            superseded: self.read_option_u32()?.map(TimerId),
            delay: Duration(self.read_u64()?),
        }))
    }

    fn decode_scan_pass(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ScanPass(ScanPassEvent {
            at: HostTime(self.read_u64()?),
            elapsed: self.read_option_u64()?.map(Duration),
            pass_index: self.read_u64()?,
            report: self.read_report()?,
        }))
    }

    fn decode_reveal(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Reveal(RevealEvent {
            at: HostTime(self.read_u64()?),
            target: match self.read_u8()? {
                0 => RevealTarget::Media,
                _ => RevealTarget::Overlay,
            },
        }))
    }

    fn decode_detach(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Detach(DetachEvent {
            at: HostTime(self.read_u64()?),
            cancelled_timers: self.read_u32()?,
            passes: self.read_u64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<RecordedEvent> {
        let tag = self.read_u8()?;
        match tag {
            TAG_ATTACH => self.decode_attach(),
            TAG_MUTATION_BATCH => self.decode_mutation_batch(),
            TAG_RESCAN_SCHEDULED => self.decode_rescan_scheduled(),
            TAG_SCAN_PASS => self.decode_scan_pass(),
            TAG_REVEAL => self.decode_reveal(),
            TAG_DETACH => self.decode_detach(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use blackout_core::config::ScanConfig;
    use blackout_core::document::{Document, NodeId};
    use blackout_core::dom::ElementKind;
    use blackout_core::mutation::MutationRecord;
    use blackout_core::scan::ScanScheduler;
    use blackout_core::timer::ManualTimers;
    use blackout_core::trace::Tracer;
    use kurbo::Rect;

    fn report(trigger: TriggerKind) -> ScanReport {
        ScanReport {
            trigger,
            candidates: 4,
            included: 3,
            concealed: 2,
            overlays: 1,
            skipped: 0,
        }
    }

    #[test]
    fn scan_pass_keeps_optional_elapsed() {
        let mut rec = RecorderSink::new();
        let timed = ScanPassEvent::new(&report(TriggerKind::Scroll), 7, HostTime(900))
            .with_elapsed(Duration(3));
        let untimed = ScanPassEvent::new(&report(TriggerKind::Mutation), 8, HostTime(1_200));
        rec.on_scan_pass(&timed);
        rec.on_scan_pass(&untimed);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(
            events,
            [RecordedEvent::ScanPass(timed), RecordedEvent::ScanPass(untimed)]
        );
    }

    #[test]
    fn superseded_timer_survives_encoding() {
        let mut rec = RecorderSink::new();
        let e = RescanScheduledEvent {
            at: HostTime(40),
            trigger: TriggerKind::Mutation,
            timer: TimerId(9),
            superseded: Some(TimerId(0)),
            delay: Duration(100),
        };
        rec.on_rescan_scheduled(&e);
        let decoded = decode(rec.as_bytes()).next();
        assert_eq!(decoded, Some(RecordedEvent::RescanScheduled(e)));
    }

    #[test]
    fn truncated_recording_stops_cleanly() {
        let mut rec = RecorderSink::new();
        rec.on_reveal(&RevealEvent {
            at: HostTime(1),
            target: RevealTarget::Media,
        });
        rec.on_detach(&DetachEvent {
            at: HostTime(2),
            cancelled_timers: 1,
            passes: 3,
        });
        let bytes = rec.into_bytes();
        let cut = &bytes[..bytes.len() - 4];
        let events: Vec<_> = decode(cut).collect();
        assert_eq!(events.len(), 1, "only the complete reveal record decodes");
        assert!(matches!(events[0], RecordedEvent::Reveal(_)));
    }

    #[test]
    fn unknown_tag_ends_decoding() {
        let events: Vec<_> = decode(&[0xff, 1, 2, 3]).collect();
        assert!(events.is_empty(), "unknown tags are not skipped");
    }

    #[test]
    fn records_a_session_driven_through_the_tracer() {
        let mut doc = Document::new();
        let body = doc.body();
        let article = doc.append_element(body, ElementKind::Article);
        let photo = doc.append_element(article, ElementKind::Div);
        doc.set_attribute(photo, "data-testid", "tweetPhoto");
        let img = doc.append_element(photo, ElementKind::Image);
        doc.set_bounds(img, Rect::new(0.0, 0.0, 300.0, 300.0));

        let mut scheduler = ScanScheduler::new(ScanConfig::timeline());
        let mut timers = ManualTimers::new();
        let mut rec = RecorderSink::new();

        let startup = scheduler.attach(&mut doc);
        let records: Vec<MutationRecord<NodeId>> = Vec::new();
        let scheduled = scheduler.on_mutations(&doc, &records, &mut timers);
        let cancelled_timers = scheduler.detach(&mut timers);
        {
            let mut tracer = Tracer::new(&mut rec);
            tracer.attach(&AttachEvent {
                at: HostTime::ZERO,
                startup,
            });
            tracer.scan_pass(&ScanPassEvent::new(&startup, scheduler.passes(), HostTime::ZERO));
            tracer.mutation_batch(&MutationBatchEvent {
                at: HostTime(5),
                records: 0,
                added_nodes: 0,
                relevant: scheduled.is_some(),
            });
            tracer.detach(&DetachEvent {
                at: HostTime(10),
                cancelled_timers,
                passes: scheduler.passes(),
            });
        }

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 4);
        let RecordedEvent::Attach(attach) = events[0] else {
            panic!("expected attach first, got {:?}", events[0]);
        };
        assert_eq!(attach.startup.concealed, 1);
        assert!(matches!(
            events[2],
            RecordedEvent::MutationBatch(MutationBatchEvent { relevant: false, .. })
        ));
        assert_eq!(events[3].at(), HostTime(10));
    }
}
