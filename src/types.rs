//! Core types for spark-ui.
//!
//! These types are shared by every subsystem: node handles the reconciler
//! hands to render targets, the JSON value model that state and props use,
//! and the cleanup closures returned by anything that registers a callback.

use std::fmt;

pub use serde_json::{Map, Value};

// =============================================================================
// Node Handles
// =============================================================================

/// Opaque handle to a node owned by a [`RenderTarget`](crate::renderer::RenderTarget).
///
/// The reconciler never looks inside a handle; targets map it to whatever
/// their host uses (an arena slot, a DOM node, a widget id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Raw index of this handle.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Value Model
// =============================================================================

/// Component props and state snapshots: an insertion-ordered JSON object.
pub type Props = Map<String, Value>;

/// Cleanup function returned by subscriptions and registrations.
///
/// Call this to release whatever was registered.
pub type Cleanup = Box<dyn FnOnce()>;

/// Build a [`Props`] map from a JSON value.
///
/// Objects are taken as-is; any other value yields an empty map.
pub fn props_from(value: Value) -> Props {
    match value {
        Value::Object(map) => map,
        _ => Props::new(),
    }
}

/// JSON-ish truthiness used by directives and middleware results.
///
/// `null`, `false`, `0`, `""` and empty arrays are falsy; everything else
/// (including empty objects) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Render a value for display inside markup.
///
/// Strings are emitted bare, `null` as an empty string, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
