// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reversible per-element concealment.
//!
//! Each included element moves through
//!
//! ```text
//!   Untouched ──apply()──► Concealed ──click()──► Revealed
//! ```
//!
//! and never backwards. The state is not kept in a registry: it *is* the
//! element's class list (see [`ConcealStyle`]), so it disappears together
//! with the element when the timeline prunes old posts.
//!
//! Images and background layers are masked directly. Videos are left alone
//! so native playback controls keep working; instead their container gets a
//! cover overlay, and the overlay carries the state.

use crate::config::{ConcealStyle, MarkupConfig};
use crate::dom::{self, Descendants, ElementKind, ElementTree, ElementTreeMut};

/// Concealment state of one element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConcealmentState {
    /// Never concealed.
    Untouched,
    /// Masked, waiting for a click.
    Concealed,
    /// Dismissed by the viewer. Terminal.
    Revealed,
}

/// What [`ConcealmentController::apply`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApplyOutcome {
    /// The element was masked and given a reveal listener.
    Concealed,
    /// A cover overlay was added to the video's container.
    OverlayInserted,
    /// The element was already concealed or revealed.
    AlreadyHandled,
    /// The video's container already owns an overlay.
    OverlayPresent,
    /// The video has no container, or the host could not create the
    /// overlay. The video stays visible.
    Skipped,
}

impl ApplyOutcome {
    /// Returns `true` if the call changed the document.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Concealed | Self::OverlayInserted)
    }
}

/// Which kind of element a click revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RevealTarget {
    /// A masked image or background layer.
    Media,
    /// A video cover overlay.
    Overlay,
}

/// What a reveal listener should do with the click that triggered it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClickOutcome {
    /// Cancel the host page's default action (navigation, media viewer).
    pub prevent_default: bool,
    /// Keep the click from reaching the host page's own handlers.
    pub stop_propagation: bool,
    /// Set when this click performed the `Concealed → Revealed` transition.
    pub revealed: Option<RevealTarget>,
}

impl ClickOutcome {
    /// The outcome for a click on a node without a reveal listener.
    pub const IGNORED: Self = Self {
        prevent_default: false,
        stop_propagation: false,
        revealed: None,
    };

    const fn swallowed(revealed: Option<RevealTarget>) -> Self {
        Self {
            prevent_default: true,
            stop_propagation: true,
            revealed,
        }
    }
}

/// Applies and lifts concealment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConcealmentController {
    style: ConcealStyle,
    markup: MarkupConfig,
}

impl Default for ConcealmentController {
    fn default() -> Self {
        Self::new(ConcealStyle::blackout(), MarkupConfig::x_timeline())
    }
}

impl ConcealmentController {
    /// Creates a controller using `style` classes and the `markup` contract
    /// (for locating video containers).
    #[must_use]
    pub const fn new(style: ConcealStyle, markup: MarkupConfig) -> Self {
        Self { style, markup }
    }

    /// Returns the class names in use.
    #[must_use]
    pub const fn style(&self) -> &ConcealStyle {
        &self.style
    }

    /// Reads the state tag of a media element.
    ///
    /// Videos always read as [`Untouched`](ConcealmentState::Untouched);
    /// their state lives on the container's overlay (see
    /// [`overlay_state`](Self::overlay_state)).
    #[must_use]
    pub fn state<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node) -> ConcealmentState {
        if tree.has_class(node, self.style.revealed_class) {
            ConcealmentState::Revealed
        } else if tree.has_class(node, self.style.concealed_class) {
            ConcealmentState::Concealed
        } else {
            ConcealmentState::Untouched
        }
    }

    /// Reads the state of a video container's overlay.
    #[must_use]
    pub fn overlay_state<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        container: &T::Node,
    ) -> ConcealmentState {
        match self.find_overlay(tree, container) {
            None => ConcealmentState::Untouched,
            Some(overlay) if tree.has_class(&overlay, self.style.overlay_revealed_class) => {
                ConcealmentState::Revealed
            }
            Some(_) => ConcealmentState::Concealed,
        }
    }

    /// Conceals `node` unless it is already concealed or revealed.
    ///
    /// The caller is responsible for having classified `node` as included.
    pub fn apply<T: ElementTreeMut + ?Sized>(&self, tree: &mut T, node: &T::Node) -> ApplyOutcome {
        if self.state(&*tree, node) != ConcealmentState::Untouched {
            return ApplyOutcome::AlreadyHandled;
        }
        if tree.kind(node) == ElementKind::Video {
            return self.cover_video(tree, node);
        }
        tree.add_class(node, self.style.concealed_class);
        tree.listen_for_reveal(node);
        ApplyOutcome::Concealed
    }

    /// Handles a click on a node that carries a reveal listener.
    ///
    /// The click is always swallowed, even after the reveal, so a stray
    /// second click on a revealed image does not open the host page's
    /// viewer. Only the first click changes state.
    pub fn click<T: ElementTreeMut + ?Sized>(&self, tree: &mut T, node: &T::Node) -> ClickOutcome {
        let style = &self.style;
        if tree.has_class(node, style.overlay_class) {
            if tree.has_class(node, style.overlay_revealed_class) {
                return ClickOutcome::swallowed(None);
            }
            tree.add_class(node, style.overlay_revealed_class);
            return ClickOutcome::swallowed(Some(RevealTarget::Overlay));
        }
        match self.state(&*tree, node) {
            ConcealmentState::Concealed => {
                tree.remove_class(node, style.concealed_class);
                tree.add_class(node, style.revealed_class);
                ClickOutcome::swallowed(Some(RevealTarget::Media))
            }
            ConcealmentState::Revealed => ClickOutcome::swallowed(None),
            // No listener is ever attached to an untouched node.
            ConcealmentState::Untouched => ClickOutcome::IGNORED,
        }
    }

    /// Returns the container a video overlay anchors to: the nearest video
    /// container marker, else the video's parent.
    #[must_use]
    pub fn video_container<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        video: &T::Node,
    ) -> Option<T::Node> {
        dom::closest(tree, video, |n| {
            dom::attribute_equals(
                tree,
                n,
                self.markup.test_id_attribute,
                self.markup.video_container,
            )
        })
        .or_else(|| tree.parent(video))
    }

    /// Returns the overlay inside `container`, if one exists.
    #[must_use]
    pub fn find_overlay<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        container: &T::Node,
    ) -> Option<T::Node> {
        Descendants::exclusive(tree, container.clone())
            .find(|n| tree.has_class(n, self.style.overlay_class))
    }

    fn cover_video<T: ElementTreeMut + ?Sized>(&self, tree: &mut T, video: &T::Node) -> ApplyOutcome {
        let Some(container) = self.video_container(&*tree, video) else {
            return ApplyOutcome::Skipped;
        };
        if self.find_overlay(&*tree, &container).is_some() {
            return ApplyOutcome::OverlayPresent;
        }
        if !has_explicit_position(&*tree, &container) {
            tree.set_style_property(&container, "position", "relative");
        }
        let Some(overlay) =
            tree.append_overlay(&container, self.style.overlay_class, self.style.overlay_label)
        else {
            return ApplyOutcome::Skipped;
        };
        tree.listen_for_reveal(&overlay);
        ApplyOutcome::OverlayInserted
    }
}

/// Returns whether the node's inline style already establishes a
/// positioning context (anything but `static`).
fn has_explicit_position<T: ElementTree + ?Sized>(tree: &T, node: &T::Node) -> bool {
    tree.style_property(node, "position")
        .is_some_and(|value| !value.trim().eq_ignore_ascii_case("static"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, NodeId};

    fn video_post(doc: &mut Document) -> (NodeId, NodeId) {
        let article = doc.append_element(doc.body(), ElementKind::Article);
        let container = doc.append_element(article, ElementKind::Div);
        doc.set_attribute(container, "data-testid", "videoComponent");
        let video = doc.append_element(container, ElementKind::Video);
        (container, video)
    }

    #[test]
    fn image_conceal_then_reveal() {
        let mut doc = Document::new();
        let article = doc.append_element(doc.body(), ElementKind::Article);
        let img = doc.append_element(article, ElementKind::Image);
        let controller = ConcealmentController::default();

        assert_eq!(controller.state(&doc, &img), ConcealmentState::Untouched);
        assert_eq!(controller.apply(&mut doc, &img), ApplyOutcome::Concealed);
        assert_eq!(controller.state(&doc, &img), ConcealmentState::Concealed);
        assert!(doc.has_reveal_listener(img));

        let first = controller.click(&mut doc, &img);
        assert!(first.prevent_default && first.stop_propagation);
        assert_eq!(first.revealed, Some(RevealTarget::Media));
        assert_eq!(controller.state(&doc, &img), ConcealmentState::Revealed);
        assert!(!doc.has_class(&img, "timeline-image-blackout"), "mask removed");

        let second = controller.click(&mut doc, &img);
        assert_eq!(second.revealed, None);
        assert!(second.prevent_default, "stray clicks are still swallowed");
        assert_eq!(controller.state(&doc, &img), ConcealmentState::Revealed);
    }

    #[test]
    fn apply_is_idempotent_and_monotonic() {
        let mut doc = Document::new();
        let img = doc.append_element(doc.body(), ElementKind::Image);
        let controller = ConcealmentController::default();

        assert!(controller.apply(&mut doc, &img).changed());
        assert_eq!(controller.apply(&mut doc, &img), ApplyOutcome::AlreadyHandled);
        assert_eq!(doc.classes(img).len(), 1);

        let _ = controller.click(&mut doc, &img);
        assert_eq!(controller.apply(&mut doc, &img), ApplyOutcome::AlreadyHandled);
        assert_eq!(
            controller.state(&doc, &img),
            ConcealmentState::Revealed,
            "revealed never goes back to concealed"
        );
    }

    #[test]
    fn click_on_untouched_node_changes_nothing() {
        let mut doc = Document::new();
        let img = doc.append_element(doc.body(), ElementKind::Image);
        let controller = ConcealmentController::default();

        assert_eq!(controller.click(&mut doc, &img), ClickOutcome::IGNORED);
        assert_eq!(controller.state(&doc, &img), ConcealmentState::Untouched);
    }

    #[test]
    fn video_gets_one_overlay() {
        let mut doc = Document::new();
        let (container, video) = video_post(&mut doc);
        let controller = ConcealmentController::default();

        assert_eq!(controller.apply(&mut doc, &video), ApplyOutcome::OverlayInserted);
        assert_eq!(controller.apply(&mut doc, &video), ApplyOutcome::OverlayPresent);

        let overlays = doc
            .children(container)
            .filter(|c| doc.has_class(c, "video-blackout-overlay"))
            .count();
        assert_eq!(overlays, 1);
        assert_eq!(
            doc.style_property(&container, "position").as_deref(),
            Some("relative")
        );
        assert!(!doc.has_class(&video, "timeline-image-blackout"), "video itself untouched");
        assert_eq!(controller.overlay_state(&doc, &container), ConcealmentState::Concealed);
    }

    #[test]
    fn overlay_reveal_keeps_node() {
        let mut doc = Document::new();
        let (container, video) = video_post(&mut doc);
        let controller = ConcealmentController::default();
        let _ = controller.apply(&mut doc, &video);
        let overlay = controller
            .find_overlay(&doc, &container)
            .expect("overlay inserted");

        let outcome = controller.click(&mut doc, &overlay);
        assert_eq!(outcome.revealed, Some(RevealTarget::Overlay));
        assert!(doc.is_alive(overlay));
        assert_eq!(controller.overlay_state(&doc, &container), ConcealmentState::Revealed);
        assert_eq!(controller.click(&mut doc, &overlay).revealed, None);

        assert_eq!(
            controller.apply(&mut doc, &video),
            ApplyOutcome::OverlayPresent,
            "a revealed overlay is never replaced"
        );
    }

    #[test]
    fn explicit_position_is_preserved() {
        let mut doc = Document::new();
        let (container, video) = video_post(&mut doc);
        doc.set_style_property(&container, "position", "absolute");
        let controller = ConcealmentController::default();

        let _ = controller.apply(&mut doc, &video);
        assert_eq!(
            doc.style_property(&container, "position").as_deref(),
            Some("absolute")
        );
    }

    #[test]
    fn static_position_is_replaced() {
        let mut doc = Document::new();
        let (container, video) = video_post(&mut doc);
        doc.set_style_property(&container, "position", "static");
        let _ = ConcealmentController::default().apply(&mut doc, &video);
        assert_eq!(
            doc.style_property(&container, "position").as_deref(),
            Some("relative")
        );
    }

    #[test]
    fn video_without_container_falls_back_to_parent() {
        let mut doc = Document::new();
        let article = doc.append_element(doc.body(), ElementKind::Article);
        let wrap = doc.append_element(article, ElementKind::Div);
        let video = doc.append_element(wrap, ElementKind::Video);
        let controller = ConcealmentController::default();

        assert_eq!(controller.video_container(&doc, &video), Some(wrap));
        assert_eq!(controller.apply(&mut doc, &video), ApplyOutcome::OverlayInserted);
        assert!(controller.find_overlay(&doc, &wrap).is_some());
    }

    #[test]
    fn detached_video_is_skipped() {
        let mut doc = Document::new();
        let video = doc.create_element(ElementKind::Video);
        let controller = ConcealmentController::default();

        assert_eq!(controller.apply(&mut doc, &video), ApplyOutcome::Skipped);
        assert!(!ApplyOutcome::Skipped.changed());
    }
}
