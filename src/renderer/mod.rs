//! Renderer Module - Markup to live tree
//!
//! ```text
//! markup → parse → VNode → patch(previous) → RenderTarget mutations
//! ```
//!
//! - **vnode** - Abstract tree and the structural equality check
//! - **parser** - Lenient markup scanner producing the first top-level element
//! - **diff** - Positional reconciler and the retained-tree [`Reconciler`]
//! - **target** - The [`RenderTarget`] adapter the reconciler writes through
//! - **memory** - Headless [`MemoryTarget`] with a mutation log

mod diff;
mod memory;
mod parser;
mod target;
mod vnode;

pub use diff::{materialize, patch, read_tree, Reconciler};
pub use memory::{MemoryTarget, Mutation, NodeFlags};
pub use parser::parse;
pub use target::{
    dispatch_event, find_with_attribute, input_value, NodeListener, RenderTarget, SharedTarget,
    TargetEvent,
};
pub use vnode::{is_different, Attributes, VNode};
