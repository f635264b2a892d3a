//! In-memory render target.
//!
//! An arena of nodes that records every tree mutation it performs. Useful as
//! a headless host and for asserting exactly which operations a patch made.
//!
//! Removed nodes stay in the arena, detached, so stale handles keep working
//! as no-ops instead of aliasing new nodes.

use std::fmt::Write as _;

use indexmap::IndexMap;

use super::target::{NodeListener, RenderTarget};
use crate::types::NodeId;

bitflags::bitflags! {
    /// Per-node behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        const NONE = 0;
        const HIDDEN = 1 << 0;
        const FOCUSED = 1 << 1;
    }
}

/// A tree operation performed on a [`MemoryTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    CloneNode { source: NodeId, node: NodeId },
    SetText { node: NodeId, text: String },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    AppendChild { parent: NodeId, child: NodeId },
    InsertBefore { parent: NodeId, child: NodeId, reference: NodeId },
    RemoveChild { parent: NodeId, child: NodeId },
    ReplaceChild { parent: NodeId, new_child: NodeId, old_child: NodeId },
    SetHidden { node: NodeId, hidden: bool },
    Focus { node: NodeId },
    SetValue { node: NodeId, value: String },
}

#[derive(Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Clone)]
struct NodeData {
    kind: NodeKind,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    flags: NodeFlags,
    value: Option<String>,
    listeners: IndexMap<(String, String), NodeListener>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            parent: None,
            flags: NodeFlags::NONE,
            value: None,
            listeners: IndexMap::new(),
        }
    }
}

/// Arena-backed render target with a mutation log.
pub struct MemoryTarget {
    nodes: Vec<NodeData>,
    log: Vec<Mutation>,
    focused: Option<NodeId>,
    root: NodeId,
}

impl Default for MemoryTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTarget {
    /// Create a target holding a single `root` element.
    pub fn new() -> Self {
        let root = NodeData::new(NodeKind::Element {
            tag: "root".to_string(),
            attrs: IndexMap::new(),
        });
        Self {
            nodes: vec![root],
            log: Vec::new(),
            focused: None,
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create an element attached to the root, without logging it.
    ///
    /// Intended for containers that components are mounted into.
    pub fn create_container(&mut self, tag: &str) -> NodeId {
        let node = self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
        });
        self.attach(self.root, node, None);
        node
    }

    // -------------------------------------------------------------------------
    // Mutation log
    // -------------------------------------------------------------------------

    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    /// Return and clear the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.log)
    }

    pub fn clear_mutations(&mut self) {
        self.log.clear();
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn flags(&self, node: NodeId) -> NodeFlags {
        self.get(node).map_or(NodeFlags::NONE, |n| n.flags)
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.flags(node).contains(NodeFlags::HIDDEN)
    }

    /// Node holding focus, if any.
    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Number of nodes ever created, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First element in `node`'s subtree (including itself) with this tag.
    pub fn find_by_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        if self.tag(node).as_deref() == Some(tag) {
            return Some(node);
        }
        self.get(node)?
            .children
            .iter()
            .find_map(|&child| self.find_by_tag(child, tag))
    }

    /// Serialize the children of `node` as markup.
    pub fn inner_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(data) = self.get(node) {
            for &child in &data.children {
                self.write_markup(child, &mut out);
            }
        }
        out
    }

    /// Serialize `node` and its subtree as markup.
    pub fn to_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.get(node) else { return };
        match &data.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{value}\"");
                    }
                }
                out.push('>');
                for &child in &data.children {
                    self.write_markup(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Arena
    // -------------------------------------------------------------------------

    fn get(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.index())
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(node.index())
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind));
        id
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.get(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|&c| c != child);
        }
        if let Some(child) = self.get_mut(child) {
            child.parent = None;
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) {
        if self.get(parent).is_none() || self.get(child).is_none() || parent == child {
            return;
        }
        self.detach(child);
        if let Some(data) = self.get_mut(parent) {
            let index = position.unwrap_or(data.children.len()).min(data.children.len());
            data.children.insert(index, child);
        }
        if let Some(data) = self.get_mut(child) {
            data.parent = Some(parent);
        }
    }

    fn deep_clone(&mut self, source: NodeId) -> Option<NodeId> {
        let data = self.get(source)?;
        let mut copy = NodeData::new(data.kind.clone());
        copy.flags = data.flags - NodeFlags::FOCUSED;
        copy.value = data.value.clone();
        let children = data.children.clone();

        let id = NodeId(self.nodes.len());
        self.nodes.push(copy);
        for child in children {
            if let Some(child_copy) = self.deep_clone(child) {
                self.attach(id, child_copy, None);
            }
        }
        Some(id)
    }

    fn is_child_of(&self, parent: NodeId, child: NodeId) -> bool {
        self.get(child).and_then(|n| n.parent) == Some(parent)
    }
}

impl RenderTarget for MemoryTarget {
    fn create_element(&mut self, tag: &str) -> NodeId {
        let node = self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
        });
        self.log.push(Mutation::CreateElement {
            node,
            tag: tag.to_string(),
        });
        node
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let node = self.alloc(NodeKind::Text(text.to_string()));
        self.log.push(Mutation::CreateText {
            node,
            text: text.to_string(),
        });
        node
    }

    fn clone_node(&mut self, node: NodeId) -> Option<NodeId> {
        let copy = self.deep_clone(node)?;
        self.log.push(Mutation::CloneNode {
            source: node,
            node: copy,
        });
        Some(copy)
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        match &self.get(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.get(node)?.kind {
            NodeKind::Text(text) => Some(text.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let Some(data) = self.get_mut(node) else { return };
        if let NodeKind::Text(content) = &mut data.kind {
            *content = text.to_string();
            self.log.push(Mutation::SetText {
                node,
                text: text.to_string(),
            });
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.get(node)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        match self.get(node).map(|n| &n.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(data) = self.get_mut(node) else { return };
        if let NodeKind::Element { attrs, .. } = &mut data.kind {
            attrs.insert(name.to_string(), value.to_string());
            self.log.push(Mutation::SetAttribute {
                node,
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let Some(data) = self.get_mut(node) else { return };
        if let NodeKind::Element { attrs, .. } = &mut data.kind {
            if attrs.shift_remove(name).is_some() {
                self.log.push(Mutation::RemoveAttribute {
                    node,
                    name: name.to_string(),
                });
            }
        }
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.get(parent).is_none() || self.get(child).is_none() {
            return;
        }
        self.attach(parent, child, None);
        self.log.push(Mutation::AppendChild { parent, child });
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        if !self.is_child_of(parent, reference) || self.get(child).is_none() {
            self.append_child(parent, child);
            return;
        }
        self.detach(child);
        let index = self
            .get(parent)
            .and_then(|p| p.children.iter().position(|&c| c == reference));
        self.attach(parent, child, index);
        self.log.push(Mutation::InsertBefore {
            parent,
            child,
            reference,
        });
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.is_child_of(parent, child) {
            return;
        }
        self.detach(child);
        self.log.push(Mutation::RemoveChild { parent, child });
    }

    fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) {
        if !self.is_child_of(parent, old_child) || self.get(new_child).is_none() {
            return;
        }
        self.detach(new_child);
        let index = self
            .get(parent)
            .and_then(|p| p.children.iter().position(|&c| c == old_child));
        self.detach(old_child);
        self.attach(parent, new_child, index);
        self.log.push(Mutation::ReplaceChild {
            parent,
            new_child,
            old_child,
        });
    }

    fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        let Some(data) = self.get_mut(node) else { return };
        data.flags.set(NodeFlags::HIDDEN, hidden);
        self.log.push(Mutation::SetHidden { node, hidden });
    }

    fn focus(&mut self, node: NodeId) {
        if self.get(node).is_none() {
            return;
        }
        if let Some(previous) = self.focused.take() {
            if let Some(data) = self.get_mut(previous) {
                data.flags.remove(NodeFlags::FOCUSED);
            }
        }
        if let Some(data) = self.get_mut(node) {
            data.flags.insert(NodeFlags::FOCUSED);
        }
        self.focused = Some(node);
        self.log.push(Mutation::Focus { node });
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        let Some(data) = self.get_mut(node) else { return };
        data.value = Some(value.to_string());
        self.log.push(Mutation::SetValue {
            node,
            value: value.to_string(),
        });
    }

    fn value(&self, node: NodeId) -> Option<String> {
        self.get(node)?.value.clone()
    }

    fn set_listener(&mut self, node: NodeId, event: &str, slot: &str, listener: NodeListener) {
        if let Some(data) = self.get_mut(node) {
            data.listeners
                .insert((event.to_string(), slot.to_string()), listener);
        }
    }

    fn listeners(&self, node: NodeId, event: &str) -> Vec<NodeListener> {
        self.get(node)
            .map(|data| {
                data.listeners
                    .iter()
                    .filter(|((name, _), _)| name == event)
                    .map(|(_, listener)| listener.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::target::{dispatch_event, SharedTarget, TargetEvent};
    use crate::types::Value;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn test_build_and_serialize() {
        let mut target = MemoryTarget::new();
        let container = target.create_container("div");
        let p = target.create_element("p");
        target.set_attribute(p, "class", "lead");
        let text = target.create_text("hi");
        target.append_child(p, text);
        target.append_child(container, p);

        assert_eq!(target.inner_markup(container), r#"<p class="lead">hi</p>"#);
        assert_eq!(target.parent(p), Some(container));
    }

    #[test]
    fn test_mutation_log() {
        let mut target = MemoryTarget::new();
        let container = target.create_container("div");
        assert!(target.mutations().is_empty(), "containers are not logged");

        let span = target.create_element("span");
        target.append_child(container, span);
        target.remove_child(container, span);
        target.remove_child(container, span);

        assert_eq!(
            target.take_mutations(),
            vec![
                Mutation::CreateElement { node: span, tag: "span".into() },
                Mutation::AppendChild { parent: container, child: span },
                Mutation::RemoveChild { parent: container, child: span },
            ]
        );
        assert!(target.mutations().is_empty());
    }

    #[test]
    fn test_replace_and_insert_before() {
        let mut target = MemoryTarget::new();
        let list = target.create_container("ul");
        let a = target.create_element("a");
        let b = target.create_element("b");
        let c = target.create_element("c");
        target.append_child(list, a);
        target.append_child(list, b);

        target.replace_child(list, c, a);
        assert_eq!(target.children(list), vec![c, b]);
        assert_eq!(target.parent(a), None);

        target.insert_before(list, a, b);
        assert_eq!(target.children(list), vec![c, a, b]);
    }

    #[test]
    fn test_clone_is_deep_and_detached() {
        let mut target = MemoryTarget::new();
        let container = target.create_container("div");
        let li = target.create_element("li");
        target.set_attribute(li, "data-id", "1");
        let text = target.create_text("x");
        target.append_child(li, text);
        target.append_child(container, li);

        let copy = target.clone_node(li).unwrap();
        assert_ne!(copy, li);
        assert_eq!(target.parent(copy), None);
        assert_eq!(target.to_markup(copy), target.to_markup(li));
        assert_ne!(target.children(copy), target.children(li));
    }

    #[test]
    fn test_flags() {
        let mut target = MemoryTarget::new();
        let a = target.create_container("input");
        let b = target.create_container("input");

        target.set_hidden(a, true);
        assert!(target.is_hidden(a));
        target.set_hidden(a, false);
        assert!(!target.is_hidden(a));

        target.focus(a);
        target.focus(b);
        assert_eq!(target.focused(), Some(b));
        assert!(!target.flags(a).contains(NodeFlags::FOCUSED));
        assert!(target.flags(b).contains(NodeFlags::FOCUSED));
    }

    #[test]
    fn test_listener_slots_replace() {
        let target: SharedTarget = Rc::new(RefCell::new(MemoryTarget::new()));
        let button = target.borrow_mut().create_element("button");
        let count = Rc::new(Cell::new(0));

        for _ in 0..3 {
            let count = count.clone();
            target.borrow_mut().set_listener(
                button,
                "click",
                "handler",
                Rc::new(move |_: &TargetEvent| count.set(count.get() + 1)),
            );
        }

        assert_eq!(dispatch_event(&target, button, "click", Value::Null), 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_listener_may_mutate_target() {
        let target: SharedTarget = Rc::new(RefCell::new(MemoryTarget::new()));
        let button = target.borrow_mut().create_element("button");

        let inner = target.clone();
        target.borrow_mut().set_listener(
            button,
            "click",
            "rename",
            Rc::new(move |event: &TargetEvent| inner.borrow_mut().set_attribute(event.node, "data-clicked", "yes")),
        );

        dispatch_event(&target, button, "click", Value::Null);
        assert_eq!(
            target.borrow().attribute(button, "data-clicked").as_deref(),
            Some("yes")
        );
    }

    #[test]
    fn test_unknown_handles_are_noops() {
        let mut target = MemoryTarget::new();
        let ghost = NodeId(999);
        target.set_text(ghost, "x");
        target.append_child(target.root(), ghost);
        assert!(target.children(target.root()).is_empty());
        assert!(target.mutations().is_empty());
    }
}
