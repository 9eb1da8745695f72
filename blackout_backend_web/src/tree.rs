// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element-tree capability traits over the live DOM.
//!
//! Nodes are `web_sys::Node` references, compared by identity. DOM write
//! failures are ignored; a failed write leaves the element as it was.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use kurbo::Rect;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use web_sys::{Document, Element, Event, HtmlElement, Node};

use blackout_core::conceal::{ClickOutcome, ConcealmentController};
use blackout_core::dom::{ElementKind, ElementTree, ElementTreeMut};

/// Called after every handled click with the controller's decision.
pub(crate) type ClickHook = Rc<dyn Fn(&ClickOutcome)>;

type RevealClosure = Closure<dyn FnMut(Event)>;

/// A view of a live document.
///
/// Every reveal listener installed through a view is the same JS function.
/// It finds its element through `event.currentTarget`, so a listener holds
/// nothing on the Rust side and the element can be collected once the page
/// drops it.
///
/// Cloning is cheap: every field is a reference-counted handle.
#[derive(Clone)]
pub struct WebTree {
    document: Document,
    root: Option<Node>,
    controller: ConcealmentController,
    on_click: Rc<RefCell<Option<ClickHook>>>,
    // `None` in the view owned by the handler itself.
    reveal: Option<Rc<RevealClosure>>,
}

impl core::fmt::Debug for WebTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebTree")
            .field("root", &self.root.as_ref().map(Node::node_name))
            .field("controller", &self.controller)
            .field("on_click", &self.on_click.borrow().is_some())
            .field("reveal", &self.reveal.is_some())
            .finish_non_exhaustive()
    }
}

impl WebTree {
    /// Creates a view of `document` rooted at its body. Reveal listeners
    /// installed through this view hand clicks to `controller`.
    #[must_use]
    pub fn new(document: Document, controller: ConcealmentController) -> Self {
        let root = document.body().map(Node::from);
        let mut tree = Self {
            document,
            root,
            controller,
            on_click: Rc::new(RefCell::new(None)),
            reveal: None,
        };
        tree.reveal = Some(Rc::new(tree.reveal_handler()));
        tree
    }

    /// Returns the document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Applies to listeners already installed as well.
    pub(crate) fn set_click_hook(&mut self, hook: ClickHook) {
        *self.on_click.borrow_mut() = Some(hook);
    }

    /// Keeps the shared reveal handler alive after this view and its clones
    /// are dropped, so elements concealed through it stay clickable.
    pub(crate) fn keep_reveal_handler(&self) {
        if let Some(handler) = &self.reveal {
            core::mem::forget(Rc::clone(handler));
        }
    }

    fn reveal_handler(&self) -> RevealClosure {
        // Installs no listeners, so it holds no reference to its own closure.
        let mut view = Self {
            reveal: None,
            ..self.clone()
        };
        Closure::wrap(Box::new(move |event: Event| {
            let target = event
                .current_target()
                .and_then(|target| target.dyn_into::<Node>().ok());
            if let Some(node) = target {
                view.handle_click(&node, &event);
            }
        }) as Box<dyn FnMut(Event)>)
    }

    fn handle_click(&mut self, node: &Node, event: &Event) {
        let controller = self.controller;
        let outcome = controller.click(self, node);
        if outcome.prevent_default {
            event.prevent_default();
        }
        if outcome.stop_propagation {
            event.stop_propagation();
        }
        let hook = self.on_click.borrow().clone();
        if let Some(hook) = hook {
            hook(&outcome);
        }
    }
}

impl ElementTree for WebTree {
    type Node = Node;

    fn root(&self) -> Option<Node> {
        self.root.clone()
    }

    fn kind(&self, node: &Node) -> ElementKind {
        match node.dyn_ref::<Element>() {
            Some(el) => ElementKind::from_tag_name(&el.tag_name()),
            None => ElementKind::Text,
        }
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<Cow<'_, str>> {
        node.dyn_ref::<Element>()?
            .get_attribute(name)
            .map(Cow::Owned)
    }

    fn has_class(&self, node: &Node, class: &str) -> bool {
        node.dyn_ref::<Element>()
            .is_some_and(|el| el.class_list().contains(class))
    }

    fn style_property(&self, node: &Node, property: &str) -> Option<Cow<'_, str>> {
        let value = node
            .dyn_ref::<HtmlElement>()?
            .style()
            .get_property_value(property)
            .ok()?;
        (!value.is_empty()).then_some(Cow::Owned(value))
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_element().map(Node::from)
    }

    fn first_child(&self, node: &Node) -> Option<Node> {
        node.first_child()
    }

    fn next_sibling(&self, node: &Node) -> Option<Node> {
        node.next_sibling()
    }

    fn bounding_box(&self, node: &Node) -> Rect {
        let Some(el) = node.dyn_ref::<Element>() else {
            return Rect::ZERO;
        };
        let r = el.get_bounding_client_rect();
        Rect::from_origin_size((r.x(), r.y()), (r.width(), r.height()))
    }
}

impl ElementTreeMut for WebTree {
    fn add_class(&mut self, node: &Node, class: &str) {
        if let Some(el) = node.dyn_ref::<Element>() {
            let _ = el.class_list().add_1(class);
        }
    }

    fn remove_class(&mut self, node: &Node, class: &str) {
        if let Some(el) = node.dyn_ref::<Element>() {
            let _ = el.class_list().remove_1(class);
        }
    }

    fn set_style_property(&mut self, node: &Node, property: &str, value: &str) {
        if let Some(el) = node.dyn_ref::<HtmlElement>() {
            let _ = el.style().set_property(property, value);
        }
    }

    fn append_overlay(&mut self, container: &Node, class: &str, label: &str) -> Option<Node> {
        let overlay = self.document.create_element("div").ok()?;
        overlay.set_class_name(class);
        overlay.set_text_content(Some(label));
        container.append_child(&overlay).ok()
    }

    fn listen_for_reveal(&mut self, node: &Node) {
        if let Some(handler) = &self.reveal {
            let callback: &js_sys::Function = (**handler).as_ref().unchecked_ref();
            let _ = node.add_event_listener_with_callback("click", callback);
        }
    }
}
