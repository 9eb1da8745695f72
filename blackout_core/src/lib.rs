// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Media classification, reversible concealment, and debounced re-scanning
//! for continuously-mutating timelines.
//!
//! `blackout_core` decides which media elements of a streaming document
//! should be concealed, conceals them reversibly, and keeps that decision
//! current as new content arrives. It is `no_std` compatible (with `alloc`)
//! and never touches a real rendering engine: every operation runs against
//! the capability traits in [`dom`], so the whole engine can be exercised
//! against the synthetic [`document::Document`].
//!
//! # Architecture
//!
//! ```text
//!   Host (startup / mutation batches / scroll / timers)
//!       │
//!       ▼
//!   ScanScheduler ──► TimerHost (debounced rescans)
//!       │
//!       ▼ run_scan_pass()
//!   MediaShape discovery ──► Classifier::classify() ──► Verdict
//!                                                        │
//!                 ┌──────────────────────────────────────┘
//!                 ▼
//!   ConcealmentController::apply() ──► classes / overlays on the element
//!                 ▲
//!                 └── ConcealmentController::click() ◄── viewer click
//! ```
//!
//! **[`dom`]**: Capability traits for an element tree ("has attributes",
//! "has ancestors", "has measurable bounds") plus traversal iterators.
//!
//! **[`config`]**: The site markup contract, concealment class names, and
//! debounce delays as plain `Copy` data with `const` presets.
//!
//! **[`classify`]**: Pure predicate layer: media shapes, structural and
//! geometric exclusion, timeline containment.
//!
//! **[`conceal`]**: Per-element `untouched → concealed → revealed` state,
//! stored on the element itself, and the click-to-reveal interaction.
//!
//! **[`scan`]**: The scan pass and its three triggers (startup, mutation,
//! scroll) with single-slot debouncing.
//!
//! **[`mutation`]**: Mutation records and the added-node relevance filter.
//!
//! **[`timer`]**: The [`TimerHost`](timer::TimerHost) contract and a
//! deterministic [`ManualTimers`](timer::ManualTimers) queue.
//!
//! **[`document`]**: An arena-backed synthetic element tree with
//! generational handles, click dispatch, and a mutation log.
//!
//! **[`time`]**: Millisecond timestamps and durations.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! scan-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod classify;
pub mod conceal;
pub mod config;
pub mod document;
pub mod dom;
pub mod mutation;
pub mod scan;
pub mod time;
pub mod timer;
pub mod trace;
