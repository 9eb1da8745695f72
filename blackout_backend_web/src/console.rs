// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser console output.
//!
//! [`ConsoleSink`] implements [`TraceSink`] and writes one `console.log` line
//! per event. Lines are built by plain functions so they can be checked off
//! the browser.

use alloc::format;
use alloc::string::String;
use core::fmt::Write as _;

use wasm_bindgen::JsValue;

use blackout_core::conceal::RevealTarget;
use blackout_core::scan::TriggerKind;
use blackout_core::trace::{
    AttachEvent, DetachEvent, MutationBatchEvent, RescanScheduledEvent, RevealEvent,
    ScanPassEvent, TraceSink,
};

/// Logged once when a session attaches.
pub(crate) const LOADED: &str = "X.com Image Blackout extension loaded";

pub(crate) fn log(line: &str) {
    web_sys::console::log_1(&JsValue::from_str(line));
}

/// Writes trace events to the browser console.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink {
    quiet_batches: bool,
}

impl ConsoleSink {
    /// Creates a sink that logs every event.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            quiet_batches: false,
        }
    }

    /// Creates a sink that skips mutation batches that armed no rescan.
    /// Busy pages deliver many of them.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            quiet_batches: true,
        }
    }
}

fn trigger_name(trigger: TriggerKind) -> &'static str {
    match trigger {
        TriggerKind::Startup => "startup",
        TriggerKind::Mutation => "mutation",
        TriggerKind::Scroll => "scroll",
    }
}

fn attach_line(e: &AttachEvent) -> String {
    format!(
        "[blackout:attach] at={}ms concealed={} overlays={}",
        e.at.millis(),
        e.startup.concealed,
        e.startup.overlays,
    )
}

fn batch_line(e: &MutationBatchEvent) -> String {
    format!(
        "[blackout:mutations] records={} added={} relevant={}",
        e.records, e.added_nodes, e.relevant,
    )
}

fn scheduled_line(e: &RescanScheduledEvent) -> String {
    let mut line = format!(
        "[blackout:schedule] {} timer={} due={}ms",
        trigger_name(e.trigger),
        e.timer.0,
        e.due().millis(),
    );
    if let Some(old) = e.superseded {
        let _ = write!(line, " replaces={}", old.0);
    }
    line
}

fn pass_line(e: &ScanPassEvent) -> String {
    let r = &e.report;
    let mut line = format!(
        "[blackout:pass] #{} {} candidates={} included={} concealed={} overlays={}",
        e.pass_index,
        trigger_name(r.trigger),
        r.candidates,
        r.included,
        r.concealed,
        r.overlays,
    );
    if r.skipped > 0 {
        let _ = write!(line, " skipped={}", r.skipped);
    }
    if let Some(elapsed) = e.elapsed {
        let _ = write!(line, " in {}ms", elapsed.millis());
    }
    line
}

fn reveal_line(e: &RevealEvent) -> String {
    let what = match e.target {
        RevealTarget::Media => "media",
        RevealTarget::Overlay => "video",
    };
    format!("[blackout:reveal] {what} at={}ms", e.at.millis())
}

fn detach_line(e: &DetachEvent) -> String {
    format!(
        "[blackout:detach] passes={} cancelled_timers={}",
        e.passes, e.cancelled_timers,
    )
}

impl TraceSink for ConsoleSink {
    fn on_attach(&mut self, e: &AttachEvent) {
        log(&attach_line(e));
    }

    fn on_mutation_batch(&mut self, e: &MutationBatchEvent) {
        if self.quiet_batches && !e.relevant {
            return;
        }
        log(&batch_line(e));
    }

    fn on_rescan_scheduled(&mut self, e: &RescanScheduledEvent) {
        log(&scheduled_line(e));
    }

    fn on_scan_pass(&mut self, e: &ScanPassEvent) {
        log(&pass_line(e));
    }

    fn on_reveal(&mut self, e: &RevealEvent) {
        log(&reveal_line(e));
    }

    fn on_detach(&mut self, e: &DetachEvent) {
        log(&detach_line(e));
    }
}
