//! Render pipeline
//!
//! Connects a component instance to the live tree and keeps the two in sync.
//!
//! # Pipeline Architecture
//!
//! ```text
//! State write → render(scope) → parse → Reconciler → directives → events → lifecycle
//! ```
//!
//! ## Data Flow
//!
//! 1. **render** - the component's render function produces markup
//! 2. **parse** - markup becomes a [`VNode`](crate::renderer::VNode) tree
//! 3. **patch** - the reconciler diffs against the retained tree and mutates
//!    the target
//! 4. **post-patch** - directives and event bindings run over the live tree
//! 5. **lifecycle** - `on_mount` once, `on_update` afterwards
//!
//! ## Key Design Principles
//!
//! - **One writer per container**: a render instance owns its container
//! - **No nested passes**: writes during a pass schedule another pass
//! - **Failures stay local**: a failed pass is reported and never unwinds

pub mod lifecycle;
pub mod mount;

pub use lifecycle::{LifecycleEvent, LifecycleTracker};
pub use mount::{mount, mount_lazy, MountHandle, MountOptions};
