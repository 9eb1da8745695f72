// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Scan passes with a measured duration become complete (`"X"`) slices on
//! the thread of their trigger; everything else is an instant event.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use blackout_core::scan::{ScanReport, TriggerKind};
use blackout_core::time::HostTime;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Host milliseconds are converted to the format's microseconds.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Attach(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Attach",
                    "cat": "Session",
                    "ts": to_us(e.at),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": report_args(&e.startup),
                }));
            }
            RecordedEvent::MutationBatch(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "MutationBatch",
                    "cat": "Observer",
                    "ts": to_us(e.at),
                    "pid": 0,
                    "tid": trigger_tid(TriggerKind::Mutation),
                    "s": "t",
                    "args": {
                        "records": e.records,
                        "added_nodes": e.added_nodes,
                        "relevant": e.relevant,
                    }
                }));
            }
            RecordedEvent::RescanScheduled(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "RescanScheduled",
                    "cat": "Scheduler",
                    "ts": to_us(e.at),
                    "pid": 0,
                    "tid": trigger_tid(e.trigger),
                    "s": "t",
                    "args": {
                        "timer": e.timer.0,
                        "superseded": e.superseded.map(|t| t.0),
                        "delay_ms": e.delay.millis(),
                    }
                }));
            }
            RecordedEvent::ScanPass(e) => {
                let mut args = report_args(&e.report);
                args["pass_index"] = json!(e.pass_index);
                let event = match e.elapsed {
                    Some(elapsed) => json!({
                        "ph": "X",
                        "name": "ScanPass",
                        "cat": "Scan",
                        "ts": to_us(e.at),
                        "dur": elapsed.millis().saturating_mul(1000),
                        "pid": 0,
                        "tid": trigger_tid(e.report.trigger),
                        "args": args,
                    }),
                    None => json!({
                        "ph": "i",
                        "name": "ScanPass",
                        "cat": "Scan",
                        "ts": to_us(e.at),
                        "pid": 0,
                        "tid": trigger_tid(e.report.trigger),
                        "s": "t",
                        "args": args,
                    }),
                };
                events.push(event);
            }
            RecordedEvent::Reveal(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Reveal",
                    "cat": "Interaction",
                    "ts": to_us(e.at),
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "target": format!("{:?}", e.target),
                    }
                }));
            }
            RecordedEvent::Detach(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Detach",
                    "cat": "Session",
                    "ts": to_us(e.at),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "cancelled_timers": e.cancelled_timers,
                        "passes": e.passes,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn to_us(t: HostTime) -> u64 {
    t.millis().saturating_mul(1000)
}

/// One track per trigger, so debounced passes line up under the timers that
/// armed them.
fn trigger_tid(trigger: TriggerKind) -> u32 {
    match trigger {
        TriggerKind::Startup => 0,
        TriggerKind::Mutation => 1,
        TriggerKind::Scroll => 2,
    }
}

fn report_args(r: &ScanReport) -> Value {
    json!({
        "trigger": format!("{:?}", r.trigger),
        "candidates": r.candidates,
        "included": r.included,
        "concealed": r.concealed,
        "overlays": r.overlays,
        "skipped": r.skipped,
    })
}
