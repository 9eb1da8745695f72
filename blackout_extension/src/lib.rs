// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Content-script entry point.
//!
//! Built as a `cdylib` and loaded by the extension's content script once the
//! page has loaded. [`main`] attaches a session with the timeline preset and
//! keeps it alive for the lifetime of the page.
//!
//! With the `trace` feature, scan activity is logged to the browser console.

use wasm_bindgen::prelude::*;

use blackout_backend_web::{ConsoleSink, attach};
use blackout_core::config::ScanConfig;

/// Attaches to the page. Runs once, when the module is instantiated.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() -> Result<(), JsValue> {
    let session = attach(ScanConfig::timeline(), Box::new(ConsoleSink::quiet()))?;
    // The session observes the page until it unloads.
    core::mem::forget(session);
    Ok(())
}
