// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scan passes and their triggers.
//!
//! A scan pass walks the document once per [`MediaShape`], classifies every
//! candidate, and conceals the included ones that are still untouched. Passes
//! are idempotent, so the scheduler is free to run them whenever the
//! document may have gained media:
//!
//! - **Startup**: one pass when the scheduler is attached.
//! - **Mutation**: a batch whose added nodes hold a tracked container arms a
//!   trailing timer ([`mutation_debounce`](ScanConfig::mutation_debounce)).
//! - **Scroll**: every scroll event arms a trailing timer
//!   ([`scroll_debounce`](ScanConfig::scroll_debounce)).
//!
//! Each trigger owns a single timer slot. Re-arming cancels the previous
//! timer, so a burst of events produces one pass after the burst settles.
//! The two slots are independent of each other.

use alloc::vec::Vec;

use crate::classify::{Classifier, MediaShape, Verdict};
use crate::conceal::{ApplyOutcome, ConcealmentController, ConcealmentState};
use crate::config::ScanConfig;
use crate::dom::{Descendants, ElementTree, ElementTreeMut};
use crate::mutation::{self, MutationRecord};
use crate::time::Duration;
use crate::timer::{TimerHost, TimerId};

/// What caused a scan pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// The initial pass on attach.
    Startup,
    /// A debounced pass after relevant insertions.
    Mutation,
    /// A debounced pass after scrolling.
    Scroll,
}

/// Counters for one scan pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanReport {
    /// What caused the pass.
    pub trigger: TriggerKind,
    /// Shape matches visited. An element matching several shapes counts once
    /// per shape.
    pub candidates: u32,
    /// Matches the classifier included.
    pub included: u32,
    /// Elements newly masked.
    pub concealed: u32,
    /// Video overlays newly inserted.
    pub overlays: u32,
    /// Included videos left visible for lack of a container.
    pub skipped: u32,
}

impl ScanReport {
    /// An empty report.
    #[must_use]
    pub const fn new(trigger: TriggerKind) -> Self {
        Self {
            trigger,
            candidates: 0,
            included: 0,
            concealed: 0,
            overlays: 0,
            skipped: 0,
        }
    }

    /// Returns `true` if the pass changed the document.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.concealed > 0 || self.overlays > 0
    }

    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Concealed => self.concealed += 1,
            ApplyOutcome::OverlayInserted => self.overlays += 1,
            ApplyOutcome::Skipped => self.skipped += 1,
            ApplyOutcome::AlreadyHandled | ApplyOutcome::OverlayPresent => {}
        }
    }
}

/// A timer armed by [`ScanScheduler::on_mutations`] or
/// [`ScanScheduler::on_scroll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleOutcome {
    /// The trigger whose slot was armed.
    pub trigger: TriggerKind,
    /// The new timer.
    pub timer: TimerId,
    /// The timer it replaced, already cancelled.
    pub superseded: Option<TimerId>,
    /// How long until it fires.
    pub delay: Duration,
}

/// Drives scan passes from host events.
///
/// The scheduler owns no document and no clock: every entry point borrows
/// the tree (and, where needed, a [`TimerHost`]) for the duration of the
/// call.
#[derive(Debug)]
pub struct ScanScheduler {
    config: ScanConfig,
    classifier: Classifier,
    controller: ConcealmentController,
    mutation_timer: Option<TimerId>,
    scroll_timer: Option<TimerId>,
    attached: bool,
    passes: u64,
}

impl ScanScheduler {
    /// Creates a detached scheduler.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            classifier: Classifier::new(config.markup),
            controller: ConcealmentController::new(config.style, config.markup),
            config,
            mutation_timer: None,
            scroll_timer: None,
            attached: false,
            passes: 0,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Returns the classifier used by scan passes.
    #[must_use]
    pub const fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Returns the controller used by scan passes and reveal listeners.
    #[must_use]
    pub const fn controller(&self) -> &ConcealmentController {
        &self.controller
    }

    /// Returns whether the scheduler is accepting triggers.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Returns the number of passes run so far.
    #[must_use]
    pub const fn passes(&self) -> u64 {
        self.passes
    }

    /// Returns the armed timer for `kind`, if any. Startup never has one.
    #[must_use]
    pub const fn pending(&self, kind: TriggerKind) -> Option<TimerId> {
        match kind {
            TriggerKind::Startup => None,
            TriggerKind::Mutation => self.mutation_timer,
            TriggerKind::Scroll => self.scroll_timer,
        }
    }

    /// Starts accepting triggers and runs the startup pass.
    pub fn attach<T: ElementTreeMut + ?Sized>(&mut self, tree: &mut T) -> ScanReport {
        self.attached = true;
        self.run_scan_pass(tree, TriggerKind::Startup)
    }

    /// Runs one scan pass over `tree`.
    ///
    /// Shapes are visited in [`MediaShape::ALL`] order, elements in document
    /// order within each shape. Matches are collected before any of them is
    /// concealed, so overlays inserted by this pass are never visited by it.
    pub fn run_scan_pass<T: ElementTreeMut + ?Sized>(
        &mut self,
        tree: &mut T,
        trigger: TriggerKind,
    ) -> ScanReport {
        self.passes += 1;
        let mut report = ScanReport::new(trigger);
        let Some(root) = tree.root() else {
            return report;
        };
        for shape in MediaShape::ALL {
            let matches: Vec<T::Node> = {
                let view: &T = tree;
                Descendants::inclusive(view, root.clone())
                    .filter(|n| self.classifier.matches_shape(view, n, shape))
                    .collect()
            };
            for node in matches {
                report.candidates += 1;
                if self.classifier.classify(&*tree, &node) != Verdict::Included {
                    continue;
                }
                report.included += 1;
                if self.controller.state(&*tree, &node) == ConcealmentState::Untouched {
                    report.record(self.controller.apply(tree, &node));
                }
            }
        }
        report
    }

    /// Handles a batch of mutation records.
    ///
    /// Arms the mutation timer if any added node is, or contains, a tracked
    /// container. Returns `None` (and leaves any armed timer alone) for
    /// irrelevant batches or when detached.
    pub fn on_mutations<T, H>(
        &mut self,
        tree: &T,
        records: &[MutationRecord<T::Node>],
        timers: &mut H,
    ) -> Option<ScheduleOutcome>
    where
        T: ElementTree + ?Sized,
        H: TimerHost + ?Sized,
    {
        if !self.attached || !mutation::batch_is_relevant(&self.classifier, tree, records) {
            return None;
        }
        Some(self.arm(TriggerKind::Mutation, timers))
    }

    /// Handles a scroll event by re-arming the scroll timer.
    pub fn on_scroll<H: TimerHost + ?Sized>(&mut self, timers: &mut H) -> Option<ScheduleOutcome> {
        if !self.attached {
            return None;
        }
        Some(self.arm(TriggerKind::Scroll, timers))
    }

    /// Handles a fired timer.
    ///
    /// Runs a pass if `id` is the timer currently armed in one of the slots
    /// and clears that slot. Superseded or unknown ids are ignored.
    pub fn on_timer<T: ElementTreeMut + ?Sized>(
        &mut self,
        tree: &mut T,
        id: TimerId,
    ) -> Option<ScanReport> {
        if !self.attached {
            return None;
        }
        let trigger = if self.mutation_timer == Some(id) {
            self.mutation_timer = None;
            TriggerKind::Mutation
        } else if self.scroll_timer == Some(id) {
            self.scroll_timer = None;
            TriggerKind::Scroll
        } else {
            return None;
        };
        Some(self.run_scan_pass(tree, trigger))
    }

    /// Cancels both timers and stops accepting triggers.
    ///
    /// Returns how many armed timers were cancelled. Concealed elements stay
    /// concealed and keep their reveal listeners.
    pub fn detach<H: TimerHost + ?Sized>(&mut self, timers: &mut H) -> u32 {
        self.attached = false;
        let mut cancelled = 0;
        for id in [self.mutation_timer.take(), self.scroll_timer.take()]
            .into_iter()
            .flatten()
        {
            timers.clear_timeout(id);
            cancelled += 1;
        }
        cancelled
    }

    fn arm<H: TimerHost + ?Sized>(&mut self, trigger: TriggerKind, timers: &mut H) -> ScheduleOutcome {
        let (slot, delay) = match trigger {
            TriggerKind::Mutation => (&mut self.mutation_timer, self.config.mutation_debounce),
            TriggerKind::Scroll => (&mut self.scroll_timer, self.config.scroll_debounce),
            TriggerKind::Startup => unreachable!("the startup pass is never debounced"),
        };
        let superseded = slot.take();
        if let Some(old) = superseded {
            timers.clear_timeout(old);
        }
        let timer = timers.set_timeout(trigger, delay);
        *slot = Some(timer);
        ScheduleOutcome {
            trigger,
            timer,
            superseded,
            delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::Rect;

    use super::*;
    use crate::document::{Document, NodeId};
    use crate::dom::ElementKind;
    use crate::timer::ManualTimers;

    struct Timeline {
        photo: NodeId,
        avatar: NodeId,
        video_container: NodeId,
    }

    /// Builds a detached `article` holding a photo of `size` and returns the
    /// article and the image.
    fn photo_post(doc: &mut Document, size: f64) -> (NodeId, NodeId) {
        let article = doc.create_element(ElementKind::Article);
        let photo = doc.append_element(article, ElementKind::Div);
        doc.set_attribute(photo, "data-testid", "tweetPhoto");
        let img = doc.append_element(photo, ElementKind::Image);
        doc.set_bounds(img, Rect::new(0.0, 0.0, size, size));
        (article, img)
    }

    fn timeline(doc: &mut Document) -> Timeline {
        let body = doc.body();
        let (article, photo) = photo_post(doc, 300.0);
        doc.append_child(body, article);

        let avatar = doc.append_element(article, ElementKind::Image);
        doc.set_bounds(avatar, Rect::new(0.0, 0.0, 32.0, 32.0));

        let post = doc.append_element(body, ElementKind::Article);
        let video_container = doc.append_element(post, ElementKind::Div);
        doc.set_attribute(video_container, "data-testid", "videoComponent");
        let video = doc.append_element(video_container, ElementKind::Video);
        doc.set_bounds(video, Rect::new(0.0, 0.0, 640.0, 360.0));

        let _ = doc.take_mutations();
        Timeline {
            photo,
            avatar,
            video_container,
        }
    }

    fn overlay_count(doc: &Document, container: NodeId) -> usize {
        doc.children(container)
            .filter(|c| doc.has_class(c, "video-blackout-overlay"))
            .count()
    }

    fn attached(doc: &mut Document) -> ScanScheduler {
        let mut scheduler = ScanScheduler::new(ScanConfig::timeline());
        let _ = scheduler.attach(doc);
        scheduler
    }

    #[test]
    fn startup_pass_conceals_media() {
        let mut doc = Document::new();
        let t = timeline(&mut doc);
        let mut scheduler = ScanScheduler::new(ScanConfig::timeline());

        let report = scheduler.attach(&mut doc);
        assert_eq!(report.trigger, TriggerKind::Startup);
        assert_eq!(report.concealed, 1);
        assert_eq!(report.overlays, 1);
        assert_eq!(scheduler.passes(), 1);

        let controller = scheduler.controller();
        assert_eq!(controller.state(&doc, &t.photo), ConcealmentState::Concealed);
        assert_eq!(
            controller.state(&doc, &t.avatar),
            ConcealmentState::Untouched,
            "32x32 image is an icon"
        );
        assert_eq!(overlay_count(&doc, t.video_container), 1);
    }

    #[test]
    fn repeated_passes_are_idempotent() {
        let mut doc = Document::new();
        let t = timeline(&mut doc);
        let mut scheduler = attached(&mut doc);
        let classes_after_first: Vec<_> = doc.classes(t.photo).to_vec();

        for _ in 0..3 {
            let report = scheduler.run_scan_pass(&mut doc, TriggerKind::Scroll);
            assert!(!report.changed());
            assert!(report.included >= 2);
        }
        assert_eq!(doc.classes(t.photo), classes_after_first.as_slice());
        assert_eq!(overlay_count(&doc, t.video_container), 1);
    }

    #[test]
    fn revealed_media_stays_revealed() {
        let mut doc = Document::new();
        let t = timeline(&mut doc);
        let mut scheduler = attached(&mut doc);

        let dispatch = doc.dispatch_click(scheduler.controller(), t.photo);
        assert!(!dispatch.reached_page());
        let _ = scheduler.run_scan_pass(&mut doc, TriggerKind::Mutation);
        assert_eq!(
            scheduler.controller().state(&doc, &t.photo),
            ConcealmentState::Revealed
        );
    }

    #[test]
    fn pruned_posts_leave_no_state_behind() {
        let mut doc = Document::new();
        let t = timeline(&mut doc);
        let mut scheduler = attached(&mut doc);
        assert!(doc.has_reveal_listener(t.photo));

        let wrapper = doc.parent(&t.photo).expect("photo wrapper");
        let article = doc.parent(&wrapper).expect("post");
        doc.destroy(article);
        assert!(!doc.is_alive(t.photo));

        // The next post reuses the freed slots and starts from scratch.
        let (post, img) = photo_post(&mut doc, 300.0);
        assert!(img.generation() > 0, "slot was reused");
        assert!(!doc.has_reveal_listener(img));
        assert_eq!(
            scheduler.controller().state(&doc, &img),
            ConcealmentState::Untouched
        );

        doc.append_child(doc.body(), post);
        let report = scheduler.run_scan_pass(&mut doc, TriggerKind::Mutation);
        assert_eq!(report.concealed, 1);
        let dispatch = doc.dispatch_click(scheduler.controller(), img);
        assert_eq!(dispatch.handled_by, Some(img));
        assert_eq!(
            scheduler.controller().state(&doc, &img),
            ConcealmentState::Revealed
        );
    }

    #[test]
    fn mutation_burst_coalesces_into_one_pass() {
        let mut doc = Document::new();
        let _ = timeline(&mut doc);
        let mut scheduler = attached(&mut doc);
        let mut timers = ManualTimers::new();
        let body = doc.body();

        let mut images = Vec::new();
        for _ in 0..10 {
            let (article, img) = photo_post(&mut doc, 300.0);
            doc.append_child(body, article);
            images.push(img);
            let batch = doc.take_mutations();
            assert!(scheduler.on_mutations(&doc, &batch, &mut timers).is_some());
            assert!(timers.advance(Duration(5)).is_empty());
        }
        assert_eq!(timers.pending().len(), 1);
        assert_eq!(timers.cancelled(), 9);

        let fired = timers.advance(Duration(100));
        assert_eq!(fired.len(), 1);
        let report = scheduler
            .on_timer(&mut doc, fired[0].id)
            .expect("armed timer runs a pass");
        assert_eq!(report.trigger, TriggerKind::Mutation);
        assert_eq!(report.concealed, 10);
        assert_eq!(scheduler.passes(), 2, "startup plus one debounced pass");
        assert_eq!(scheduler.pending(TriggerKind::Mutation), None);
        for img in images {
            assert_eq!(
                scheduler.controller().state(&doc, &img),
                ConcealmentState::Concealed
            );
        }
    }

    #[test]
    fn irrelevant_mutation_schedules_nothing() {
        let mut doc = Document::new();
        let _ = timeline(&mut doc);
        let mut scheduler = attached(&mut doc);
        let mut timers = ManualTimers::new();

        let reply = doc.append_element(doc.body(), ElementKind::Div);
        let text = doc.create_text("nice photo");
        doc.append_child(reply, text);
        let batch = doc.take_mutations();

        assert_eq!(scheduler.on_mutations(&doc, &batch, &mut timers), None);
        assert!(timers.pending().is_empty());
        assert_eq!(scheduler.passes(), 1);
    }

    #[test]
    fn scroll_and_mutation_slots_are_independent() {
        let mut doc = Document::new();
        let _ = timeline(&mut doc);
        let mut scheduler = attached(&mut doc);
        let mut timers = ManualTimers::new();

        let (article, _) = photo_post(&mut doc, 300.0);
        doc.append_child(doc.body(), article);
        let batch = doc.take_mutations();
        let mutation = scheduler
            .on_mutations(&doc, &batch, &mut timers)
            .expect("relevant batch");
        let scroll = scheduler.on_scroll(&mut timers).expect("attached");
        assert_eq!(mutation.delay, Duration(100));
        assert_eq!(scroll.delay, Duration(200));
        assert_eq!(scroll.superseded, None, "scroll did not cancel the mutation timer");

        let fired = timers.advance(Duration(150));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, TriggerKind::Mutation);
        let _ = scheduler.on_timer(&mut doc, fired[0].id);
        assert_eq!(scheduler.pending(TriggerKind::Scroll), Some(scroll.timer));

        let again = scheduler.on_scroll(&mut timers).expect("attached");
        assert_eq!(again.superseded, Some(scroll.timer));
        assert_eq!(
            scheduler.on_timer(&mut doc, scroll.timer),
            None,
            "superseded timer is ignored"
        );
        let fired = timers.advance(Duration(200));
        assert_eq!(fired.len(), 1);
        let report = scheduler.on_timer(&mut doc, fired[0].id).expect("current timer");
        assert_eq!(report.trigger, TriggerKind::Scroll);
    }

    #[test]
    fn late_loading_image_is_caught_by_a_later_pass() {
        let mut doc = Document::new();
        let body = doc.body();
        let (article, img) = photo_post(&mut doc, 0.0);
        doc.append_child(body, article);
        let mut scheduler = attached(&mut doc);
        assert_eq!(
            scheduler.controller().state(&doc, &img),
            ConcealmentState::Untouched,
            "unloaded image measures as an icon"
        );

        doc.set_bounds(img, Rect::new(0.0, 0.0, 500.0, 400.0));
        let report = scheduler.run_scan_pass(&mut doc, TriggerKind::Scroll);
        assert_eq!(report.concealed, 1);
    }

    #[test]
    fn detach_cancels_timers_and_ignores_triggers() {
        let mut doc = Document::new();
        let t = timeline(&mut doc);
        let mut scheduler = attached(&mut doc);
        let mut timers = ManualTimers::new();

        let (article, _) = photo_post(&mut doc, 300.0);
        doc.append_child(doc.body(), article);
        let batch = doc.take_mutations();
        let mutation = scheduler.on_mutations(&doc, &batch, &mut timers);
        let scroll = scheduler.on_scroll(&mut timers);
        assert!(mutation.is_some() && scroll.is_some());

        assert_eq!(scheduler.detach(&mut timers), 2);
        assert!(!scheduler.is_attached());
        assert!(timers.pending().is_empty());
        assert_eq!(scheduler.on_scroll(&mut timers), None);
        assert_eq!(scheduler.on_mutations(&doc, &batch, &mut timers), None);
        let stale = mutation.map(|m| m.timer).expect("armed before detach");
        assert_eq!(scheduler.on_timer(&mut doc, stale), None);
        assert_eq!(
            scheduler.controller().state(&doc, &t.photo),
            ConcealmentState::Concealed,
            "detaching leaves concealment in place"
        );
    }

    #[test]
    fn empty_document_pass_is_harmless() {
        let mut doc = Document::new();
        let mut scheduler = ScanScheduler::new(ScanConfig::default());
        let report = scheduler.attach(&mut doc);
        assert_eq!(report, ScanReport::new(TriggerKind::Startup));
        assert!(scheduler.is_attached());
    }
}
