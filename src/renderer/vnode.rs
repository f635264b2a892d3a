//! Abstract tree - the structural form of one render's output.
//!
//! A [`VNode`] is rebuilt on every render. The previous tree is kept only so
//! the reconciler can diff against it.

use indexmap::IndexMap;

/// Element attributes in document order.
pub type Attributes = IndexMap<String, String>;

/// Node of an abstract tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VNode {
    /// Text leaf
    Text(String),
    /// Element with tag, attributes and ordered children
    Element {
        tag: String,
        attrs: Attributes,
        children: Vec<VNode>,
    },
}

impl VNode {
    pub fn text(content: impl Into<String>) -> Self {
        VNode::Text(content.into())
    }

    /// Element with no attributes.
    pub fn element(tag: impl Into<String>, children: Vec<VNode>) -> Self {
        VNode::Element {
            tag: tag.into(),
            attrs: Attributes::new(),
            children,
        }
    }

    /// Add an attribute (builder style). A no-op on text leaves.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let VNode::Element { attrs, .. } = &mut self {
            attrs.insert(name.into(), value.into());
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Element { tag, .. } => Some(tag),
            VNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } => children,
            VNode::Text(_) => &[],
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, VNode::Text(_))
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(VNode::node_count).sum::<usize>()
    }
}

/// Structural difference check.
///
/// Trees are equal when both are the same text, or both are elements with the
/// same tag, the same attribute set in any order, and pairwise-equal children.
pub fn is_different(a: &VNode, b: &VNode) -> bool {
    match (a, b) {
        (VNode::Text(x), VNode::Text(y)) => x != y,
        (
            VNode::Element {
                tag: tag_a,
                attrs: attrs_a,
                children: children_a,
            },
            VNode::Element {
                tag: tag_b,
                attrs: attrs_b,
                children: children_b,
            },
        ) => {
            tag_a != tag_b
                || attrs_a.len() != attrs_b.len()
                || attrs_a.iter().any(|(k, v)| attrs_b.get(k) != Some(v))
                || children_a.len() != children_b.len()
                || children_a
                    .iter()
                    .zip(children_b)
                    .any(|(x, y)| is_different(x, y))
        }
        _ => true,
    }
}
