// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser backend for blackout.
//!
//! This crate connects [`blackout_core`] to a live page:
//!
//! - [`WebTree`]: the element-tree capability traits over `web_sys::Node`,
//!   including click-to-reveal listeners.
//! - [`WindowTimers`]: a `setTimeout`/`clearTimeout` timer host.
//! - [`Session`]: a `MutationObserver` on `document.body` plus a scroll
//!   listener, driving a [`ScanScheduler`](blackout_core::scan::ScanScheduler).
//! - [`ConsoleSink`]: a trace sink writing to the browser console.
//!
//! Call [`attach`] once the page has loaded.

#![no_std]

extern crate alloc;

mod console;
mod session;
mod timers;
mod tree;

pub use console::ConsoleSink;
pub use session::{Session, attach};
pub use timers::WindowTimers;
pub use tree::WebTree;

use blackout_core::time::HostTime;

/// Returns the current host time from `performance.now()`, in whole
/// milliseconds.
#[must_use]
pub fn now() -> HostTime {
    millis_to_host_time(timers::performance_now())
}

/// Converts a `DOMHighResTimeStamp` to a [`HostTime`], clamping negative and
/// non-finite values to zero.
#[must_use]
pub fn millis_to_host_time(ms: f64) -> HostTime {
    if !ms.is_finite() || ms <= 0.0 {
        return HostTime::ZERO;
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "checked positive and finite above; page lifetimes fit in u64 ms"
    )]
    let ms = ms as u64;
    HostTime(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_time_truncates_to_millis() {
        assert_eq!(millis_to_host_time(16.9), HostTime(16));
        assert_eq!(millis_to_host_time(1_234_567.0), HostTime(1_234_567));
    }

    #[test]
    fn bogus_timestamps_clamp_to_zero() {
        assert_eq!(millis_to_host_time(-3.0), HostTime::ZERO);
        assert_eq!(millis_to_host_time(f64::NAN), HostTime::ZERO);
        assert_eq!(millis_to_host_time(f64::INFINITY), HostTime::ZERO);
    }
}
