// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Page session: observer, scroll listener, and timers around one scheduler.
//!
//! All state lives in a single `Rc<RefCell<_>>` shared by the JS callbacks.
//! Callbacks run on the page's event loop, one at a time; a scan pass never
//! re-enters a callback because `MutationObserver` delivery is asynchronous.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Event, MutationObserver, MutationObserverInit, Node, Window};

use blackout_core::conceal::ClickOutcome;
use blackout_core::config::ScanConfig;
use blackout_core::mutation::{self, MutationRecord};
use blackout_core::scan::{ScanReport, ScanScheduler};
use blackout_core::time::HostTime;
use blackout_core::timer::TimerId;
use blackout_core::trace::{
    AttachEvent, DetachEvent, MutationBatchEvent, RescanScheduledEvent, RevealEvent,
    ScanPassEvent, TraceSink, Tracer,
};

use crate::console;
use crate::timers::WindowTimers;
use crate::tree::WebTree;

type SharedSink = Rc<RefCell<Box<dyn TraceSink>>>;
type MutationClosure = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;
type ScrollClosure = Closure<dyn FnMut(Event)>;

struct SessionInner {
    scheduler: ScanScheduler,
    tree: WebTree,
    timers: WindowTimers,
    sink: SharedSink,
}

impl SessionInner {
    fn tracer<R>(&self, f: impl FnOnce(&mut Tracer<'_>) -> R) -> R {
        let mut sink = self.sink.borrow_mut();
        let mut tracer = Tracer::new(&mut **sink);
        f(&mut tracer)
    }

    fn trace_pass(&self, report: &ScanReport, started: HostTime) {
        let event = ScanPassEvent::new(report, self.scheduler.passes(), started)
            .with_elapsed(crate::now().saturating_duration_since(started));
        self.tracer(|t| t.scan_pass(&event));
    }

    fn on_mutations(&mut self, records: &[MutationRecord<Node>]) {
        let at = crate::now();
        let scheduled = self
            .scheduler
            .on_mutations(&self.tree, records, &mut self.timers);
        let batch = MutationBatchEvent {
            at,
            records: saturating_u32(records.len()),
            added_nodes: saturating_u32(mutation::added_count(records)),
            relevant: scheduled.is_some(),
        };
        self.tracer(|t| {
            t.mutation_batch(&batch);
            if let Some(outcome) = &scheduled {
                t.rescan_scheduled(&RescanScheduledEvent::new(outcome, at));
            }
        });
    }

    fn on_scroll(&mut self) {
        let at = crate::now();
        if let Some(outcome) = self.scheduler.on_scroll(&mut self.timers) {
            self.tracer(|t| t.rescan_scheduled(&RescanScheduledEvent::new(&outcome, at)));
        }
    }

    fn on_timer(&mut self, id: TimerId) {
        let started = crate::now();
        if let Some(report) = self.scheduler.on_timer(&mut self.tree, id) {
            self.trace_pass(&report, started);
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// A live attachment to the page.
///
/// Dropping the session (or calling [`detach`](Self::detach)) disconnects the
/// observer, removes the scroll listener, and cancels armed timers. Concealed
/// elements stay concealed and keep their reveal listeners: every element
/// shares one handler, which outlives the session. To keep the session alive
/// for the lifetime of the page, leak it with [`core::mem::forget`].
pub struct Session {
    inner: Rc<RefCell<SessionInner>>,
    window: Window,
    observer: MutationObserver,
    // Called by `observer` until it is disconnected.
    _on_mutation: MutationClosure,
    on_scroll: ScrollClosure,
    attached: Cell<bool>,
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Session")
            .field("attached", &self.attached.get())
            .field("passes", &inner.scheduler.passes())
            .field("timers", &inner.timers)
            .finish_non_exhaustive()
    }
}

/// Attaches to the current page.
///
/// Runs the startup pass, then observes child-list changes under
/// `document.body` and scroll events on the window. Fails if the window,
/// document, or body is unavailable, or if the observer cannot be created.
pub fn attach(config: ScanConfig, sink: Box<dyn TraceSink>) -> Result<Session, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no document.body"))?;

    let mut scheduler = ScanScheduler::new(config);
    let sink: SharedSink = Rc::new(RefCell::new(sink));

    let mut tree = WebTree::new(document, *scheduler.controller());
    let reveal_sink = Rc::clone(&sink);
    tree.set_click_hook(Rc::new(move |outcome: &ClickOutcome| {
        if let Some(event) = RevealEvent::from_click(outcome, crate::now()) {
            let mut sink = reveal_sink.borrow_mut();
            Tracer::new(&mut **sink).reveal(&event);
        }
    }));

    let at = crate::now();
    let startup = scheduler.attach(&mut tree);

    let inner = Rc::new_cyclic(|weak: &Weak<RefCell<SessionInner>>| {
        let weak = weak.clone();
        let timers = WindowTimers::new(move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().on_timer(id);
            }
        });
        RefCell::new(SessionInner {
            scheduler,
            tree,
            timers,
            sink,
        })
    });
    {
        let inner = inner.borrow();
        inner.tracer(|t| t.attach(&AttachEvent { at, startup }));
        inner.trace_pass(&startup, at);
    }

    let observed = Rc::clone(&inner);
    let on_mutation = Closure::wrap(Box::new(move |list: js_sys::Array, _: MutationObserver| {
        let records = child_list_records(&list);
        observed.borrow_mut().on_mutations(&records);
    }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

    let scrolled = Rc::clone(&inner);
    let on_scroll = Closure::wrap(Box::new(move |_: Event| {
        scrolled.borrow_mut().on_scroll();
    }) as Box<dyn FnMut(Event)>);

    let observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    observer.observe_with_options(&body, &init)?;
    window.add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref())?;

    console::log(console::LOADED);

    Ok(Session {
        inner,
        window,
        observer,
        _on_mutation: on_mutation,
        on_scroll,
        attached: Cell::new(true),
    })
}

impl Session {
    /// Returns whether the session is still observing the page.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    /// Returns the number of scan passes run so far.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.inner.borrow().scheduler.passes()
    }

    /// Stops observing the page. Calling it again is a no-op.
    pub fn detach(&self) {
        if !self.attached.replace(false) {
            return;
        }
        self.observer.disconnect();
        let _ = self
            .window
            .remove_event_listener_with_callback("scroll", self.on_scroll.as_ref().unchecked_ref());
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        let cancelled_timers = inner.scheduler.detach(&mut inner.timers);
        let event = DetachEvent {
            at: crate::now(),
            cancelled_timers,
            passes: inner.scheduler.passes(),
        };
        inner.tracer(|t| t.detach(&event));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.detach();
        self.inner.borrow().tree.keep_reveal_handler();
    }
}

/// Converts an observer batch into core records. Only child-list records are
/// kept, with their added nodes.
fn child_list_records(list: &js_sys::Array) -> Vec<MutationRecord<Node>> {
    list.iter()
        .filter_map(|value| value.dyn_into::<web_sys::MutationRecord>().ok())
        .filter(|record| record.type_() == "childList")
        .filter_map(|record| {
            let nodes = record.added_nodes();
            let added = (0..nodes.length()).filter_map(|i| nodes.item(i)).collect();
            Some(MutationRecord::child_list(record.target()?, added, Vec::new()))
        })
        .collect()
}
