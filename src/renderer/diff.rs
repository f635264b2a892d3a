//! Reconciler - turns successive trees into minimal target mutations.
//!
//! [`patch`] compares the new tree with the previous one and mutates the live
//! tree under a container. [`Reconciler`] keeps the previous tree between
//! passes.
//!
//! # Algorithm
//!
//! 1. No previous tree: materialize the new one into the container
//! 2. No new tree: clear the container
//! 3. Trees structurally equal: no mutation at all
//! 4. Kind or tag differs: replace the live node with a fresh subtree
//! 5. Same tag: set new or changed attributes, remove missing ones, then
//!    patch children by position
//!
//! Children are matched by index, not by key. Inserting into the middle of a
//! list rewrites every following sibling.

use super::target::RenderTarget;
use super::vnode::{is_different, VNode};
use crate::types::NodeId;

/// Build a detached live subtree for `node`.
pub fn materialize(target: &mut dyn RenderTarget, node: &VNode) -> NodeId {
    match node {
        VNode::Text(text) => target.create_text(text),
        VNode::Element {
            tag,
            attrs,
            children,
        } => {
            let element = target.create_element(tag);
            for (name, value) in attrs {
                target.set_attribute(element, name, value);
            }
            for child in children {
                let live = materialize(target, child);
                target.append_child(element, live);
            }
            element
        }
    }
}

/// Read a live subtree back into a tree, the inverse of [`materialize`].
///
/// Returns `None` for an unknown node.
pub fn read_tree(target: &dyn RenderTarget, node: NodeId) -> Option<VNode> {
    if let Some(text) = target.text(node) {
        return Some(VNode::Text(text));
    }
    let tag = target.tag(node)?;
    let children = target
        .children(node)
        .into_iter()
        .filter_map(|child| read_tree(target, child))
        .collect();
    Some(VNode::Element {
        tag,
        attrs: target.attributes(node).into_iter().collect(),
        children,
    })
}

/// Reconcile the live tree under `container` from `old` to `new`.
///
/// The root of a tree corresponds to the container's first child.
pub fn patch(
    target: &mut dyn RenderTarget,
    container: NodeId,
    new: Option<&VNode>,
    old: Option<&VNode>,
) {
    match (new, old) {
        (None, _) => target.clear_children(container),
        (Some(new), None) => {
            let live = materialize(target, new);
            target.append_child(container, live);
        }
        (Some(new), Some(old)) => {
            let live = target.children(container).first().copied();
            patch_node(target, container, live, new, old);
        }
    }
}

fn patch_node(
    target: &mut dyn RenderTarget,
    parent: NodeId,
    live: Option<NodeId>,
    new: &VNode,
    old: &VNode,
) {
    if !is_different(new, old) {
        return;
    }

    // The live tree diverged from the retained one
    let Some(live) = live else {
        let fresh = materialize(target, new);
        target.append_child(parent, fresh);
        return;
    };

    match (new, old) {
        (VNode::Text(text), VNode::Text(_)) => target.set_text(live, text),
        (
            VNode::Element {
                tag: new_tag,
                attrs: new_attrs,
                children: new_children,
            },
            VNode::Element {
                tag: old_tag,
                attrs: old_attrs,
                children: old_children,
            },
        ) if new_tag == old_tag => {
            for (name, value) in new_attrs {
                if old_attrs.get(name) != Some(value) {
                    target.set_attribute(live, name, value);
                }
            }
            for name in old_attrs.keys() {
                if !new_attrs.contains_key(name) {
                    target.remove_attribute(live, name);
                }
            }

            // Snapshot so removals do not shift the positions we patch
            let live_children = target.children(live);
            let len = new_children.len().max(old_children.len());
            for index in 0..len {
                match (new_children.get(index), old_children.get(index)) {
                    (Some(new_child), Some(old_child)) => patch_node(
                        target,
                        live,
                        live_children.get(index).copied(),
                        new_child,
                        old_child,
                    ),
                    (Some(new_child), None) => {
                        let fresh = materialize(target, new_child);
                        target.append_child(live, fresh);
                    }
                    (None, Some(_)) => {
                        if let Some(&stale) = live_children.get(index) {
                            target.remove_child(live, stale);
                        }
                    }
                    (None, None) => {}
                }
            }
        }
        _ => {
            let fresh = materialize(target, new);
            target.replace_child(parent, fresh, live);
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Retains the previous tree of one container between passes.
#[derive(Debug, Default)]
pub struct Reconciler {
    previous: Option<VNode>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the container in line with `next`.
    ///
    /// Without a previous tree the container is cleared and `next` is
    /// materialized from scratch. Returns true if the tree changed.
    pub fn render(&mut self, target: &mut dyn RenderTarget, container: NodeId, next: VNode) -> bool {
        let changed = match &self.previous {
            Some(previous) => {
                let changed = is_different(&next, previous);
                if changed {
                    patch(target, container, Some(&next), Some(previous));
                }
                changed
            }
            None => {
                target.clear_children(container);
                patch(target, container, Some(&next), None);
                true
            }
        };
        tracing::trace!(%container, changed, "reconciled");
        self.previous = Some(next);
        changed
    }

    /// Clear the container and forget the previous tree.
    pub fn clear(&mut self, target: &mut dyn RenderTarget, container: NodeId) {
        patch(target, container, None, self.previous.as_ref());
        self.previous = None;
    }

    /// Force the next render to rebuild from scratch.
    ///
    /// Call after the live tree was changed behind the reconciler's back.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    /// Take the live tree under `container` as the previous tree.
    ///
    /// Call after the live tree was changed behind the reconciler's back, so
    /// the next render diffs against what is actually there. Falls back to
    /// [`invalidate`](Self::invalidate) when the container is empty.
    pub fn adopt(&mut self, target: &dyn RenderTarget, container: NodeId) {
        self.previous = target
            .children(container)
            .first()
            .and_then(|&root| read_tree(target, root));
    }

    /// Check if we have a previous tree to diff against.
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    pub fn previous(&self) -> Option<&VNode> {
        self.previous.as_ref()
    }
}
