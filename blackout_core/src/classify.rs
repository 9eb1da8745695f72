// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Media classification.
//!
//! [`Classifier::classify`] decides whether an element is concealable media.
//! The decision is a pure function of the element, its ancestor chain, and
//! its rendered geometry, evaluated in this order:
//!
//! 1. **Containment**: the element must sit under a timeline container (a
//!    post `<article>` or the primary column). Anything else is excluded
//!    without further tests.
//! 2. **Structural exclusion**: the element or an ancestor matches an
//!    avatar/profile/icon pattern.
//! 3. **Geometric exclusion**: an image whose rendered box is at most
//!    [`icon_max_size`](MarkupConfig::icon_max_size) in both dimensions.
//! 4. **Inclusion**: the element matches one of the [`MediaShape`]s.
//! 5. Otherwise excluded.
//!
//! Geometry is read when `classify` runs. An image that is still loading may
//! measure as an icon and stay excluded until a later scan sees its final
//! size.

use crate::config::MarkupConfig;
use crate::dom::{self, Ancestors, Descendants, ElementKind, ElementTree};

/// Outcome of [`Classifier::classify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Left untouched.
    Excluded,
    /// Concealable media.
    Included,
}

/// The structural shapes that make an element a media candidate.
///
/// [`ALL`](Self::ALL) lists them in discovery order; a scan pass visits the
/// document once per shape, in that order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaShape {
    /// An image inside a photo container.
    PhotoImage,
    /// A background-image layer inside a photo container.
    PhotoBackground,
    /// A video inside a video container.
    VideoElement,
    /// A background-image poster layer inside a video container.
    VideoPoster,
    /// A background-image layer inside a post that is not itself an avatar.
    ArticleBackground,
    /// An image inside a post that is not itself an avatar and is not
    /// labelled as a profile picture.
    ArticleImage,
}

impl MediaShape {
    /// Every shape, in discovery order.
    pub const ALL: [Self; 6] = [
        Self::PhotoImage,
        Self::PhotoBackground,
        Self::VideoElement,
        Self::VideoPoster,
        Self::ArticleBackground,
        Self::ArticleImage,
    ];
}

/// Pure predicates over an [`ElementTree`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classifier {
    markup: MarkupConfig,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(MarkupConfig::x_timeline())
    }
}

impl Classifier {
    /// Creates a classifier for the given markup contract.
    #[must_use]
    pub const fn new(markup: MarkupConfig) -> Self {
        Self { markup }
    }

    /// Returns the markup contract.
    #[must_use]
    pub const fn markup(&self) -> &MarkupConfig {
        &self.markup
    }

    /// Classifies `node`.
    #[must_use]
    pub fn classify<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node) -> Verdict {
        if !self.in_timeline(tree, node) {
            return Verdict::Excluded;
        }
        if self.is_excluded(tree, node) {
            return Verdict::Excluded;
        }
        if self.media_shape(tree, node).is_some() {
            Verdict::Included
        } else {
            Verdict::Excluded
        }
    }

    /// Returns whether `node` sits inside a post wrapper or the primary
    /// content column (the node itself counts).
    #[must_use]
    pub fn in_timeline<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node) -> bool {
        Ancestors::inclusive(tree, node.clone()).any(|n| {
            tree.kind(&n) == ElementKind::Article
                || self.has_marker(tree, &n, self.markup.primary_column)
        })
    }

    /// Returns whether the structural or geometric exclusion rules reject
    /// `node`.
    #[must_use]
    pub fn is_excluded<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node) -> bool {
        if Ancestors::inclusive(tree, node.clone()).any(|n| self.is_avatar_pattern(tree, &n)) {
            return true;
        }
        self.is_icon_sized(tree, node)
    }

    /// Returns the first [`MediaShape`] `node` matches, if any.
    #[must_use]
    pub fn media_shape<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        node: &T::Node,
    ) -> Option<MediaShape> {
        MediaShape::ALL
            .into_iter()
            .find(|&shape| self.matches_shape(tree, node, shape))
    }

    /// Returns whether `node` matches `shape`.
    #[must_use]
    pub fn matches_shape<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        node: &T::Node,
        shape: MediaShape,
    ) -> bool {
        let m = &self.markup;
        let kind = tree.kind(node);
        match shape {
            MediaShape::PhotoImage => {
                kind == ElementKind::Image && self.under_marker(tree, node, m.photo_container)
            }
            MediaShape::PhotoBackground => {
                self.is_background_layer(tree, node)
                    && self.under_marker(tree, node, m.photo_container)
            }
            MediaShape::VideoElement => {
                kind == ElementKind::Video && self.under_marker(tree, node, m.video_container)
            }
            MediaShape::VideoPoster => {
                self.is_background_layer(tree, node)
                    && self.under_marker(tree, node, m.video_container)
            }
            MediaShape::ArticleBackground => {
                self.is_background_layer(tree, node)
                    && self.under_article(tree, node)
                    && !self.has_marker(tree, node, m.avatar)
            }
            MediaShape::ArticleImage => {
                kind == ElementKind::Image
                    && self.under_article(tree, node)
                    && !self.has_marker(tree, node, m.avatar)
                    && !dom::attribute_contains(tree, node, "alt", m.article_alt_exclusion)
            }
        }
    }

    /// Returns whether `node` is, or contains, a photo container, a video
    /// container, or a post wrapper.
    ///
    /// Used to decide whether an inserted subtree can hold new candidates.
    #[must_use]
    pub fn holds_tracked_container<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        node: &T::Node,
    ) -> bool {
        if !tree.kind(node).is_element() {
            return false;
        }
        Descendants::inclusive(tree, node.clone()).any(|n| self.is_tracked_container(tree, &n))
    }

    fn is_tracked_container<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node) -> bool {
        tree.kind(node) == ElementKind::Article
            || self.has_marker(tree, node, self.markup.photo_container)
            || self.has_marker(tree, node, self.markup.video_container)
    }

    /// One step of the structural exclusion walk: does this single node look
    /// like part of an avatar, profile picture, or icon button?
    fn is_avatar_pattern<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node) -> bool {
        let m = &self.markup;
        if self.has_marker(tree, node, m.avatar) {
            return true;
        }
        if tree.kind(node) == ElementKind::Image {
            if dom::has_ancestor(tree, node, |a| {
                dom::attribute_equals(tree, a, "role", m.button_role)
            }) {
                return true;
            }
            if m
                .profile_alt_keywords
                .iter()
                .any(|kw| dom::attribute_contains(tree, node, "alt", kw))
            {
                return true;
            }
        }
        tree.has_class(node, m.thumbnail_class)
            && m
                .thumbnail_sizes
                .iter()
                .any(|size| dom::attribute_contains(tree, node, "style", size))
    }

    fn is_icon_sized<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node) -> bool {
        if tree.kind(node) != ElementKind::Image {
            return false;
        }
        let rect = tree.bounding_box(node);
        let max = self.markup.icon_max_size;
        rect.width() <= max && rect.height() <= max
    }

    fn is_background_layer<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node) -> bool {
        tree.kind(node) == ElementKind::Div
            && dom::attribute_contains(tree, node, "style", "background-image")
    }

    fn has_marker<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node, marker: &str) -> bool {
        dom::attribute_equals(tree, node, self.markup.test_id_attribute, marker)
    }

    fn under_marker<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        node: &T::Node,
        marker: &str,
    ) -> bool {
        dom::has_ancestor(tree, node, |a| self.has_marker(tree, a, marker))
    }

    fn under_article<T: ElementTree + ?Sized>(&self, tree: &T, node: &T::Node) -> bool {
        dom::has_ancestor(tree, node, |a| tree.kind(a) == ElementKind::Article)
    }
}
