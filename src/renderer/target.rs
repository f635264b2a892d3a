//! Render target adapter.
//!
//! The reconciler, directives and event binder only talk to the live tree
//! through [`RenderTarget`]. A target owns its nodes and hands out opaque
//! [`NodeId`] handles; operations on unknown handles are no-ops.

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::{NodeId, Value};

/// Event delivered to a node listener.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetEvent {
    /// Event name (`click`, `input`, ...)
    pub name: String,
    /// Node the event was dispatched on
    pub node: NodeId,
    /// Current value of the node, for form elements
    pub value: Option<String>,
    /// Host-specific payload
    pub detail: Value,
}

/// Listener attached to a live node.
pub type NodeListener = Rc<dyn Fn(&TargetEvent)>;

/// Shared, dynamically typed render target.
pub type SharedTarget = Rc<RefCell<dyn RenderTarget>>;

/// Host rendering surface.
pub trait RenderTarget {
    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    /// Deep copy of a node and its subtree, detached.
    fn clone_node(&mut self, node: NodeId) -> Option<NodeId>;

    /// Tag of an element node, `None` for text nodes.
    fn tag(&self, node: NodeId) -> Option<String>;
    /// Content of a text node, `None` for elements.
    fn text(&self, node: NodeId) -> Option<String>;
    fn set_text(&mut self, node: NodeId, text: &str);

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    /// All attributes in insertion order.
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId);
    fn remove_child(&mut self, parent: NodeId, child: NodeId);
    fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId);

    /// Remove every child of `node`.
    fn clear_children(&mut self, node: NodeId) {
        for child in self.children(node) {
            self.remove_child(node, child);
        }
    }

    // -------------------------------------------------------------------------
    // Behavior
    // -------------------------------------------------------------------------

    fn set_hidden(&mut self, node: NodeId, hidden: bool);
    fn focus(&mut self, node: NodeId);
    fn set_value(&mut self, node: NodeId, value: &str);
    fn value(&self, node: NodeId) -> Option<String>;

    /// Install `listener` for `event` under `slot`, replacing whatever the
    /// same slot held. Rebinding after every patch is therefore idempotent.
    fn set_listener(&mut self, node: NodeId, event: &str, slot: &str, listener: NodeListener);
    fn listeners(&self, node: NodeId, event: &str) -> Vec<NodeListener>;
}

/// Dispatch an event on a node. Returns how many listeners ran.
///
/// The target borrow is released before listeners run, so they may patch
/// the tree.
pub fn dispatch_event(target: &SharedTarget, node: NodeId, event: &str, detail: Value) -> usize {
    let (listeners, value) = {
        let target = target.borrow();
        (target.listeners(node, event), target.value(node))
    };
    let payload = TargetEvent {
        name: event.to_string(),
        node,
        value,
        detail,
    };

    for listener in &listeners {
        listener(&payload);
    }
    listeners.len()
}

/// Set a node's value and dispatch `input` on it, like a user typing.
pub fn input_value(target: &SharedTarget, node: NodeId, value: &str) -> usize {
    target.borrow_mut().set_value(node, value);
    dispatch_event(target, node, "input", Value::Null)
}

/// Depth-first search for elements carrying `attribute`, in document order.
pub fn find_with_attribute(target: &dyn RenderTarget, root: NodeId, attribute: &str) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if target.attribute(node, attribute).is_some() {
            found.push(node);
        }
        let children = target.children(node);
        stack.extend(children.into_iter().rev());
    }
    found
}
