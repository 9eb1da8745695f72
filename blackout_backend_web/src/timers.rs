// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `setTimeout` timer host.
//!
//! The scheduler keeps at most one armed timer per trigger, so each trigger
//! gets one long-lived JS closure. Arming a trigger passes that closure to
//! `setTimeout` and remembers the returned id; the closure reports the id it
//! was armed with when it runs. A cleared timer never runs, so its id is
//! never reported.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::Cell;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use blackout_core::scan::TriggerKind;
use blackout_core::time::Duration;
use blackout_core::timer::{TimerHost, TimerId};

// Direct global bindings instead of `web_sys::Window` methods; timers are
// armed on every scroll event and these avoid fetching the Window each time.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "setTimeout")]
    fn js_set_timeout(handler: &JsValue, timeout: i32) -> i32;

    #[wasm_bindgen(js_name = "clearTimeout")]
    fn js_clear_timeout(id: i32);
}

type TimeoutClosure = Closure<dyn FnMut()>;

/// One trigger's reusable callback and the id it is currently armed with.
struct Slot {
    closure: TimeoutClosure,
    armed: Rc<Cell<Option<TimerId>>>,
}

impl Slot {
    fn new(on_fire: Rc<dyn Fn(TimerId)>) -> Self {
        let armed = Rc::new(Cell::new(None));
        let pending = Rc::clone(&armed);
        let closure = Closure::wrap(Box::new(move || {
            if let Some(id) = pending.take() {
                on_fire(id);
            }
        }) as Box<dyn FnMut()>);
        Self { closure, armed }
    }
}

/// A [`TimerHost`] backed by the window's `setTimeout`.
///
/// Fired timers are reported to the callback given to
/// [`new`](Self::new), which is expected to forward them to
/// [`ScanScheduler::on_timer`](blackout_core::scan::ScanScheduler::on_timer).
pub struct WindowTimers {
    mutation: Slot,
    scroll: Slot,
}

impl core::fmt::Debug for WindowTimers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WindowTimers")
            .field("mutation", &self.mutation.armed.get())
            .field("scroll", &self.scroll.armed.get())
            .finish()
    }
}

impl WindowTimers {
    /// Creates a timer host reporting fired timers to `on_fire`.
    pub fn new(on_fire: impl Fn(TimerId) + 'static) -> Self {
        let on_fire: Rc<dyn Fn(TimerId)> = Rc::new(on_fire);
        Self {
            mutation: Slot::new(Rc::clone(&on_fire)),
            scroll: Slot::new(on_fire),
        }
    }

    fn slot(&self, kind: TriggerKind) -> &Slot {
        match kind {
            TriggerKind::Scroll => &self.scroll,
            // Startup is rejected in debug builds by `set_timeout`.
            TriggerKind::Mutation | TriggerKind::Startup => &self.mutation,
        }
    }
}

impl TimerHost for WindowTimers {
    fn set_timeout(&mut self, kind: TriggerKind, delay: Duration) -> TimerId {
        debug_assert_ne!(kind, TriggerKind::Startup, "startup has no timer slot");
        let slot = self.slot(kind);
        let raw = js_set_timeout(slot.closure.as_ref(), delay.as_timeout_millis());
        // Browsers hand out positive ids.
        let id = TimerId(raw.cast_unsigned());
        slot.armed.set(Some(id));
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        js_clear_timeout(id.0.cast_signed());
        for slot in [&self.mutation, &self.scroll] {
            if slot.armed.get() == Some(id) {
                slot.armed.set(None);
            }
        }
    }
}
