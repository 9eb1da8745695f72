// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capability traits for element trees.
//!
//! The engine never sees a concrete DOM. It sees an [`ElementTree`]: something
//! whose nodes have a kind, attributes, classes, inline style, ancestors,
//! ordered children, and a rendered bounding box. Concealment additionally
//! needs the handful of writes in [`ElementTreeMut`].
//!
//! Node handles are cheap clones compared by identity. A browser backend
//! uses the element reference itself; the synthetic
//! [`Document`](crate::document::Document) uses generational
//! [`NodeId`](crate::document::NodeId)s.

use alloc::borrow::Cow;

use kurbo::Rect;

/// The element kinds the engine distinguishes.
///
/// Everything else is [`Other`](Self::Other). Non-element nodes (text,
/// comments) are [`Text`](Self::Text) and are never candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// An `<img>` element.
    Image,
    /// A `<video>` element.
    Video,
    /// An `<article>` element (a timeline post wrapper).
    Article,
    /// A `<div>` element, the only kind that carries background-image layers.
    Div,
    /// Any other element.
    Other,
    /// A non-element node.
    Text,
}

impl ElementKind {
    /// Maps an HTML tag name (any case) to a kind.
    #[must_use]
    pub fn from_tag_name(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("img") {
            Self::Image
        } else if tag.eq_ignore_ascii_case("video") {
            Self::Video
        } else if tag.eq_ignore_ascii_case("article") {
            Self::Article
        } else if tag.eq_ignore_ascii_case("div") {
            Self::Div
        } else {
            Self::Other
        }
    }

    /// Returns `true` for element nodes.
    #[inline]
    #[must_use]
    pub const fn is_element(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Read access to an element tree.
///
/// Implementations must be side-effect free: the classifier calls these
/// methods repeatedly and relies on them describing one stable snapshot.
pub trait ElementTree {
    /// A handle to one node. Equality is node identity.
    type Node: Clone + PartialEq;

    /// Returns the root element scans start from (the page body).
    fn root(&self) -> Option<Self::Node>;

    /// Returns the node's kind.
    fn kind(&self, node: &Self::Node) -> ElementKind;

    /// Returns the value of an attribute, if present.
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<Cow<'_, str>>;

    /// Returns whether the node's class list contains `class`.
    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    /// Returns the node's inline style value for `property`, if set and
    /// non-empty.
    fn style_property(&self, node: &Self::Node, property: &str) -> Option<Cow<'_, str>>;

    /// Returns the parent element, if any.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Returns the first child node, if any.
    fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Returns the next sibling node, if any.
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Returns the node's rendered bounding box in logical pixels.
    fn bounding_box(&self, node: &Self::Node) -> Rect;
}

/// Write access needed to conceal and reveal elements.
///
/// All writes are fail-soft: a backend that cannot perform one simply does
/// nothing (or returns `None`), and the element stays as it was.
pub trait ElementTreeMut: ElementTree {
    /// Adds `class` to the node's class list.
    fn add_class(&mut self, node: &Self::Node, class: &str);

    /// Removes `class` from the node's class list.
    fn remove_class(&mut self, node: &Self::Node, class: &str);

    /// Sets an inline style property.
    fn set_style_property(&mut self, node: &Self::Node, property: &str, value: &str);

    /// Creates a `<div>` carrying `class` with `label` as its text, appends
    /// it as the last child of `container`, and returns it.
    fn append_overlay(
        &mut self,
        container: &Self::Node,
        class: &str,
        label: &str,
    ) -> Option<Self::Node>;

    /// Attaches a click listener to `node` that routes clicks to
    /// [`ConcealmentController::click`](crate::conceal::ConcealmentController::click).
    ///
    /// Called at most once per node by the controller.
    fn listen_for_reveal(&mut self, node: &Self::Node);
}

/// Returns whether an attribute is present and contains `needle`
/// (case-sensitive, like a CSS `[name*="needle"]` selector).
#[must_use]
pub fn attribute_contains<T: ElementTree + ?Sized>(
    tree: &T,
    node: &T::Node,
    name: &str,
    needle: &str,
) -> bool {
    tree.attribute(node, name)
        .is_some_and(|value| value.contains(needle))
}

/// Returns whether an attribute is present and equal to `expected`.
#[must_use]
pub fn attribute_equals<T: ElementTree + ?Sized>(
    tree: &T,
    node: &T::Node,
    name: &str,
    expected: &str,
) -> bool {
    tree.attribute(node, name)
        .is_some_and(|value| value == expected)
}

/// Returns the nearest node, starting at `node` itself and walking up, that
/// satisfies `pred` (like `Element.closest`).
pub fn closest<T, F>(tree: &T, node: &T::Node, mut pred: F) -> Option<T::Node>
where
    T: ElementTree + ?Sized,
    F: FnMut(&T::Node) -> bool,
{
    Ancestors::inclusive(tree, node.clone()).find(|n| pred(n))
}

/// Returns whether any proper ancestor of `node` satisfies `pred`.
pub fn has_ancestor<T, F>(tree: &T, node: &T::Node, mut pred: F) -> bool
where
    T: ElementTree + ?Sized,
    F: FnMut(&T::Node) -> bool,
{
    Ancestors::exclusive(tree, node).any(|n| pred(&n))
}

/// Walks from a node towards the root.
///
/// Created by [`Ancestors::inclusive`] or [`Ancestors::exclusive`].
pub struct Ancestors<'a, T: ElementTree + ?Sized> {
    tree: &'a T,
    current: Option<T::Node>,
}

impl<'a, T: ElementTree + ?Sized> Ancestors<'a, T> {
    /// Yields `node` itself, then each ancestor.
    pub fn inclusive(tree: &'a T, node: T::Node) -> Self {
        Self {
            tree,
            current: Some(node),
        }
    }

    /// Yields each ancestor of `node`, nearest first.
    pub fn exclusive(tree: &'a T, node: &T::Node) -> Self {
        Self {
            tree,
            current: tree.parent(node),
        }
    }
}

impl<T: ElementTree + ?Sized> Iterator for Ancestors<'_, T> {
    type Item = T::Node;

    fn next(&mut self) -> Option<T::Node> {
        let node = self.current.take()?;
        self.current = self.tree.parent(&node);
        Some(node)
    }
}

impl<T: ElementTree + ?Sized> core::fmt::Debug for Ancestors<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ancestors")
            .field("exhausted", &self.current.is_none())
            .finish_non_exhaustive()
    }
}

/// Pre-order (document order) traversal of a subtree.
///
/// Walks sibling links only, so no stack is allocated. Created by
/// [`Descendants::inclusive`] or [`Descendants::exclusive`].
pub struct Descendants<'a, T: ElementTree + ?Sized> {
    tree: &'a T,
    root: T::Node,
    next: Option<T::Node>,
}

impl<'a, T: ElementTree + ?Sized> Descendants<'a, T> {
    /// Yields `root` itself, then its descendants in document order.
    pub fn inclusive(tree: &'a T, root: T::Node) -> Self {
        Self {
            tree,
            next: Some(root.clone()),
            root,
        }
    }

    /// Yields the descendants of `root` in document order, excluding `root`.
    pub fn exclusive(tree: &'a T, root: T::Node) -> Self {
        Self {
            tree,
            next: tree.first_child(&root),
            root,
        }
    }

    fn advance(&self, node: &T::Node) -> Option<T::Node> {
        if let Some(child) = self.tree.first_child(node) {
            return Some(child);
        }
        let mut current = node.clone();
        loop {
            if current == self.root {
                return None;
            }
            if let Some(sibling) = self.tree.next_sibling(&current) {
                return Some(sibling);
            }
            current = self.tree.parent(&current)?;
        }
    }
}

impl<T: ElementTree + ?Sized> Iterator for Descendants<'_, T> {
    type Item = T::Node;

    fn next(&mut self) -> Option<T::Node> {
        let node = self.next.take()?;
        self.next = self.advance(&node);
        Some(node)
    }
}

impl<T: ElementTree + ?Sized> core::fmt::Debug for Descendants<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Descendants")
            .field("exhausted", &self.next.is_none())
            .finish_non_exhaustive()
    }
}
