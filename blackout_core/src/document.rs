// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays synthetic document.
//!
//! [`Document`] is a small in-memory element tree implementing
//! [`ElementTree`] and [`ElementTreeMut`]. It exists so the whole engine can
//! run headless: the same classifier, controller, and scheduler that drive a
//! browser page drive a `Document` in tests and debugging tools.
//!
//! Nodes are addressed by generational [`NodeId`] handles. Each node occupies
//! a slot in parallel arrays; destroyed subtrees are recycled through a free
//! list, and a generation bump makes their old handles fail validation.
//!
//! Like a browser document, the tree records child-list changes under its
//! body as [`MutationRecord`]s (see [`take_mutations`](Document::take_mutations)).
//! Attribute changes made with [`set_attribute`](Document::set_attribute) are
//! recorded too. Writes performed through [`ElementTreeMut`] are not, apart
//! from overlay insertion, which is a real child-list change.

use alloc::borrow::{Cow, ToOwned};
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::conceal::{ClickOutcome, ConcealmentController};
use crate::dom::{ElementKind, ElementTree, ElementTreeMut};
use crate::mutation::MutationRecord;

/// Sentinel value indicating "no node" in index fields.
const INVALID: u32 = u32::MAX;

/// A handle to a node in a [`Document`].
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a node is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    idx: u32,
    generation: u32,
}

impl NodeId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// Result of [`Document::dispatch_click`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickDispatch {
    /// The node whose reveal listener handled the click, if any.
    pub handled_by: Option<NodeId>,
    /// What the listener decided.
    pub outcome: ClickOutcome,
}

impl ClickDispatch {
    /// Returns whether the click would continue to the host page's own
    /// handlers.
    #[must_use]
    pub const fn reached_page(&self) -> bool {
        !self.outcome.stop_propagation
    }
}

/// In-memory element tree rooted at a body element.
#[derive(Debug)]
pub struct Document {
    // -- Topology --
    parent: Vec<u32>,
    first_child: Vec<u32>,
    next_sibling: Vec<u32>,
    prev_sibling: Vec<u32>,

    // -- Node data --
    kind: Vec<ElementKind>,
    attributes: Vec<Vec<(String, String)>>,
    classes: Vec<Vec<String>>,
    bounds: Vec<Rect>,
    text: Vec<Option<String>>,
    reveal_listener: Vec<bool>,

    // -- Allocation --
    generation: Vec<u32>,
    free_list: Vec<u32>,
    len: u32,

    body: u32,
    mutations: Vec<MutationRecord<NodeId>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document holding only an empty body element.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            attributes: Vec::new(),
            classes: Vec::new(),
            bounds: Vec::new(),
            text: Vec::new(),
            reveal_listener: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            body: INVALID,
            mutations: Vec::new(),
        };
        doc.body = doc.allocate(ElementKind::Other, None);
        doc
    }

    /// Returns the body element.
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.handle(self.body)
    }

    // -- Allocation API --

    /// Creates a detached element.
    ///
    /// Elements start with no attributes, no classes, and a zero-sized
    /// bounding box.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is [`ElementKind::Text`]; use
    /// [`create_text`](Self::create_text).
    pub fn create_element(&mut self, kind: ElementKind) -> NodeId {
        assert!(kind.is_element(), "use create_text for text nodes");
        let idx = self.allocate(kind, None);
        self.handle(idx)
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, content: &str) -> NodeId {
        let idx = self.allocate(ElementKind::Text, Some(content.to_owned()));
        self.handle(idx)
    }

    /// Creates an element and appends it as the last child of `parent`.
    pub fn append_element(&mut self, parent: NodeId, kind: ElementKind) -> NodeId {
        let child = self.create_element(kind);
        self.append_child(parent, child);
        child
    }

    /// Destroys `node` and its whole subtree, freeing their slots.
    ///
    /// Handles to destroyed nodes (including those in mutation records not
    /// yet taken) become stale.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or refers to the body.
    pub fn destroy(&mut self, node: NodeId) {
        self.validate(node);
        assert!(node.idx != self.body, "cannot destroy the body");
        if self.parent[node.idx as usize] != INVALID {
            self.remove(node);
        }
        let mut stack = vec![node.idx];
        while let Some(idx) = stack.pop() {
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
            self.parent[idx as usize] = INVALID;
            self.first_child[idx as usize] = INVALID;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
            // Bump generation so old handles immediately fail validation.
            self.generation[idx as usize] += 1;
            self.free_list.push(idx);
        }
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// Records a child-list mutation if `parent` is connected to the body.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent, if
    /// `parent` is a text node, or if `parent` lies inside `child`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID && c != self.body,
            "child already has a parent"
        );
        assert!(
            self.kind[p as usize].is_element(),
            "text nodes cannot have children"
        );
        assert!(
            !self.is_inclusive_ancestor(c, p),
            "cannot append a node inside itself"
        );

        self.parent[c as usize] = p;
        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        if self.is_connected(parent) {
            self.mutations
                .push(MutationRecord::child_list(parent, vec![child], Vec::new()));
        }
    }

    /// Detaches `node` from its parent. The subtree stays alive and can be
    /// appended elsewhere.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove(&mut self, node: NodeId) {
        self.validate(node);
        let c = node.idx;
        let p = self.parent[c as usize];
        assert!(p != INVALID, "node has no parent");
        let parent = self.handle(p);
        let was_connected = self.is_connected(parent);

        let prev = self.prev_sibling[c as usize];
        let next = self.next_sibling[c as usize];
        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }
        self.parent[c as usize] = INVALID;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if was_connected {
            self.mutations
                .push(MutationRecord::child_list(parent, Vec::new(), vec![node]));
        }
    }

    /// Returns whether `node` is the body or a descendant of it.
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.validate(node);
        self.is_inclusive_ancestor(self.body, node.idx)
    }

    /// Returns an iterator over the direct children of `node`.
    pub fn children(&self, node: NodeId) -> Children<'_> {
        self.validate(node);
        Children {
            doc: self,
            current: self.first_child[node.idx as usize],
        }
    }

    // -- Node data API --

    /// Sets an attribute. Setting `class` replaces the class list.
    ///
    /// Records an attribute mutation if `node` is connected.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.validate(node);
        let idx = node.idx as usize;
        if name == "class" {
            self.classes[idx] = value.split_whitespace().map(ToOwned::to_owned).collect();
        } else {
            self.write_attribute(idx, name, value.to_owned());
        }
        if self.is_connected(node) {
            self.mutations.push(MutationRecord::attributes(node));
        }
    }

    /// Sets the rendered bounding box reported for `node`.
    pub fn set_bounds(&mut self, node: NodeId, bounds: Rect) {
        self.validate(node);
        self.bounds[node.idx as usize] = bounds;
    }

    /// Adds a class, if not already present.
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        self.validate(node);
        let classes = &mut self.classes[node.idx as usize];
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_owned());
        }
    }

    /// Removes a class, if present.
    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.validate(node);
        self.classes[node.idx as usize].retain(|c| c != class);
    }

    /// Returns the class list in insertion order.
    #[must_use]
    pub fn classes(&self, node: NodeId) -> &[String] {
        self.validate(node);
        &self.classes[node.idx as usize]
    }

    /// Returns the content of a text node.
    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.validate(node);
        self.text[node.idx as usize].as_deref()
    }

    /// Returns whether a reveal listener is attached to `node`.
    #[must_use]
    pub fn has_reveal_listener(&self, node: NodeId) -> bool {
        self.validate(node);
        self.reveal_listener[node.idx as usize]
    }

    /// Drains the recorded mutations, oldest first.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord<NodeId>> {
        core::mem::take(&mut self.mutations)
    }

    /// Simulates a click on `target`.
    ///
    /// The click bubbles from `target` towards the root; the first node
    /// carrying a reveal listener hands it to `controller`. Without a
    /// listener on the path the click is ignored.
    pub fn dispatch_click(
        &mut self,
        controller: &ConcealmentController,
        target: NodeId,
    ) -> ClickDispatch {
        self.validate(target);
        let mut idx = target.idx;
        while idx != INVALID {
            if self.reveal_listener[idx as usize] {
                let node = self.handle(idx);
                let outcome = controller.click(self, &node);
                return ClickDispatch {
                    handled_by: Some(node),
                    outcome,
                };
            }
            idx = self.parent[idx as usize];
        }
        ClickDispatch {
            handled_by: None,
            outcome: ClickOutcome::IGNORED,
        }
    }

    // -- Internal helpers --

    fn allocate(&mut self, kind: ElementKind, text: Option<String>) -> u32 {
        if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; the generation was bumped on destroy.
            let i = idx as usize;
            self.kind[i] = kind;
            self.attributes[i].clear();
            self.classes[i].clear();
            self.bounds[i] = Rect::ZERO;
            self.text[i] = text;
            self.reveal_listener[i] = false;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.attributes.push(Vec::new());
            self.classes.push(Vec::new());
            self.bounds.push(Rect::ZERO);
            self.text.push(text);
            self.reveal_listener.push(false);
            self.generation.push(0);
            idx
        }
    }

    fn handle(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn link(&self, idx: u32) -> Option<NodeId> {
        (idx != INVALID).then(|| self.handle(idx))
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn is_inclusive_ancestor(&self, ancestor: u32, mut idx: u32) -> bool {
        while idx != INVALID {
            if idx == ancestor {
                return true;
            }
            idx = self.parent[idx as usize];
        }
        false
    }

    fn read_attribute(&self, idx: usize, name: &str) -> Option<&str> {
        self.attributes[idx]
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn write_attribute(&mut self, idx: usize, name: &str, value: String) {
        let attributes = &mut self.attributes[idx];
        if let Some(slot) = attributes.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            attributes.push((name.to_owned(), value));
        }
    }
}

/// Splits an inline style attribute into `(property, value)` declarations.
fn declarations(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style.split(';').filter_map(|decl| {
        let (property, value) = decl.split_once(':')?;
        let property = property.trim();
        (!property.is_empty()).then_some((property, value.trim()))
    })
}

impl ElementTree for Document {
    type Node = NodeId;

    fn root(&self) -> Option<NodeId> {
        Some(self.body())
    }

    fn kind(&self, node: &NodeId) -> ElementKind {
        self.validate(*node);
        self.kind[node.idx as usize]
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<Cow<'_, str>> {
        self.validate(*node);
        let idx = node.idx as usize;
        if name == "class" {
            let classes = &self.classes[idx];
            return (!classes.is_empty()).then(|| Cow::Owned(classes.join(" ")));
        }
        self.read_attribute(idx, name).map(Cow::Borrowed)
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.validate(*node);
        self.classes[node.idx as usize].iter().any(|c| c == class)
    }

    fn style_property(&self, node: &NodeId, property: &str) -> Option<Cow<'_, str>> {
        self.validate(*node);
        let style = self.read_attribute(node.idx as usize, "style")?;
        declarations(style)
            .filter(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
            .last()
            .filter(|value| !value.is_empty())
            .map(Cow::Borrowed)
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.validate(*node);
        self.link(self.parent[node.idx as usize])
    }

    fn first_child(&self, node: &NodeId) -> Option<NodeId> {
        self.validate(*node);
        self.link(self.first_child[node.idx as usize])
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        self.validate(*node);
        self.link(self.next_sibling[node.idx as usize])
    }

    fn bounding_box(&self, node: &NodeId) -> Rect {
        self.validate(*node);
        self.bounds[node.idx as usize]
    }
}

impl ElementTreeMut for Document {
    fn add_class(&mut self, node: &NodeId, class: &str) {
        Self::add_class(self, *node, class);
    }

    fn remove_class(&mut self, node: &NodeId, class: &str) {
        Self::remove_class(self, *node, class);
    }

    fn set_style_property(&mut self, node: &NodeId, property: &str, value: &str) {
        self.validate(*node);
        let idx = node.idx as usize;
        let mut rules: Vec<(String, String)> = self
            .read_attribute(idx, "style")
            .map(|style| {
                declarations(style)
                    .filter(|(name, _)| !name.eq_ignore_ascii_case(property))
                    .map(|(name, value)| (name.to_owned(), value.to_owned()))
                    .collect()
            })
            .unwrap_or_default();
        rules.push((property.to_owned(), value.to_owned()));
        let mut style = String::new();
        for (name, value) in &rules {
            if !style.is_empty() {
                style.push(' ');
            }
            style.push_str(name);
            style.push_str(": ");
            style.push_str(value);
            style.push(';');
        }
        self.write_attribute(idx, "style", style);
    }

    fn append_overlay(&mut self, container: &NodeId, class: &str, label: &str) -> Option<NodeId> {
        self.validate(*container);
        if !self.kind[container.idx as usize].is_element() {
            return None;
        }
        let overlay = self.create_element(ElementKind::Div);
        Self::add_class(self, overlay, class);
        self.bounds[overlay.idx as usize] = self.bounds[container.idx as usize];
        let text = self.create_text(label);
        self.append_child(overlay, text);
        self.append_child(*container, overlay);
        Some(overlay)
    }

    fn listen_for_reveal(&mut self, node: &NodeId) {
        self.validate(*node);
        self.reveal_listener[node.idx as usize] = true;
    }
}

/// An iterator over the direct children of a node.
///
/// Created by [`Document::children`].
#[derive(Debug)]
pub struct Children<'a> {
    doc: &'a Document,
    current: u32,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.doc.next_sibling[idx as usize];
        Some(self.doc.handle(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy() {
        let mut doc = Document::new();
        let id = doc.create_element(ElementKind::Div);
        assert!(doc.is_alive(id));
        doc.destroy(id);
        assert!(!doc.is_alive(id));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut doc = Document::new();
        let id1 = doc.create_element(ElementKind::Image);
        doc.destroy(id1);
        let id2 = doc.create_element(ElementKind::Video);
        // id2 reuses the same slot but has a different generation.
        assert!(!doc.is_alive(id1));
        assert!(doc.is_alive(id2));
        assert_eq!(id1.index(), id2.index());
        assert_ne!(id1.generation(), id2.generation());
        assert_eq!(doc.kind(&id2), ElementKind::Video, "slot data is reset");
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn stale_handle_panics() {
        let mut doc = Document::new();
        let id = doc.create_element(ElementKind::Div);
        doc.destroy(id);
        let _ = doc.kind(&id);
    }

    #[test]
    fn destroy_frees_subtree() {
        let mut doc = Document::new();
        let outer = doc.append_element(doc.body(), ElementKind::Div);
        let inner = doc.append_element(outer, ElementKind::Image);
        doc.destroy(outer);
        assert!(!doc.is_alive(inner));
        assert!(doc.children(doc.body()).next().is_none());
    }

    #[test]
    fn children_in_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.append_element(body, ElementKind::Div);
        let b = doc.append_element(body, ElementKind::Image);
        let c = doc.append_element(body, ElementKind::Video);
        doc.remove(b);

        let kids: Vec<_> = doc.children(body).collect();
        assert_eq!(kids, vec![a, c]);
        assert_eq!(doc.parent(&b), None);
        assert!(doc.is_alive(b), "removal only detaches");
    }

    #[test]
    #[should_panic(expected = "cannot append a node inside itself")]
    fn cycles_are_rejected() {
        let mut doc = Document::new();
        let outer = doc.create_element(ElementKind::Div);
        let inner = doc.append_element(outer, ElementKind::Div);
        doc.append_child(inner, outer);
    }

    #[test]
    fn only_connected_changes_are_recorded() {
        let mut doc = Document::new();
        let detached = doc.create_element(ElementKind::Div);
        let _ = doc.append_element(detached, ElementKind::Image);
        doc.set_attribute(detached, "data-testid", "tweetPhoto");
        assert!(doc.take_mutations().is_empty());

        doc.append_child(doc.body(), detached);
        doc.set_attribute(detached, "aria-label", "Image");
        doc.remove(detached);
        let log = doc.take_mutations();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].added, vec![detached]);
        assert_eq!(log[1], MutationRecord::attributes(detached));
        assert_eq!(log[2].removed, vec![detached]);
        assert!(doc.take_mutations().is_empty(), "log is drained");
    }

    #[test]
    fn class_attribute_round_trips() {
        let mut doc = Document::new();
        let el = doc.append_element(doc.body(), ElementKind::Div);
        doc.set_attribute(el, "class", "a  b");
        assert!(doc.has_class(&el, "b"));
        Document::add_class(&mut doc, el, "c");
        Document::add_class(&mut doc, el, "c");
        assert_eq!(doc.attribute(&el, "class").as_deref(), Some("a b c"));
        Document::remove_class(&mut doc, el, "a");
        assert_eq!(doc.classes(el).len(), 2);
    }

    #[test]
    fn style_properties_edit_the_style_attribute() {
        let mut doc = Document::new();
        let el = doc.append_element(doc.body(), ElementKind::Div);
        doc.set_attribute(el, "style", "width: 40px; POSITION: static;");
        assert_eq!(doc.style_property(&el, "position").as_deref(), Some("static"));

        doc.set_style_property(&el, "position", "relative");
        assert_eq!(
            doc.attribute(&el, "style").as_deref(),
            Some("width: 40px; position: relative;")
        );
        assert_eq!(doc.style_property(&el, "height"), None);
    }

    #[test]
    fn overlay_is_a_labelled_last_child() {
        let mut doc = Document::new();
        let container = doc.append_element(doc.body(), ElementKind::Div);
        doc.set_bounds(container, Rect::new(0.0, 0.0, 640.0, 360.0));
        let _ = doc.append_element(container, ElementKind::Video);
        let _ = doc.take_mutations();

        let overlay = doc
            .append_overlay(&container, "cover", "Click me")
            .expect("container is an element");
        assert_eq!(doc.children(container).last(), Some(overlay));
        assert!(doc.has_class(&overlay, "cover"));
        assert_eq!(doc.bounding_box(&overlay), doc.bounding_box(&container));
        let label = doc.first_child(&overlay).expect("label node");
        assert_eq!(doc.text(label), Some("Click me"));
        assert_eq!(doc.take_mutations().len(), 1, "insertion is observable");
    }

    #[test]
    fn click_bubbles_to_listener() {
        let mut doc = Document::new();
        let wrap = doc.append_element(doc.body(), ElementKind::Div);
        let inner = doc.append_element(wrap, ElementKind::Other);
        let controller = ConcealmentController::default();

        let ignored = doc.dispatch_click(&controller, inner);
        assert_eq!(ignored.handled_by, None);
        assert!(ignored.reached_page());

        ElementTreeMut::add_class(&mut doc, &wrap, "timeline-image-blackout");
        doc.listen_for_reveal(&wrap);
        let handled = doc.dispatch_click(&controller, inner);
        assert_eq!(handled.handled_by, Some(wrap));
        assert!(!handled.reached_page());
        assert!(doc.has_class(&wrap, "timeline-image-revealed"));
    }
}
