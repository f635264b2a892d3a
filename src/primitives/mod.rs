//! Post-patch primitives - directives and event bindings.
//!
//! Both passes run over the live tree after every successful patch:
//! - [`directives`] - marker attributes bound to behaviors (`show`, `if`,
//!   `focus`, `for`, `model`, plus host-registered ones)
//! - [`events`] - `data-on="event:handler"` markers bound to component
//!   methods or app-level handlers
//!
//! # Example
//!
//! ```ignore
//! let app = App::builder(target).build();
//! // Custom directive: data-z-title="path" sets the title attribute
//! app.register_directive("title", |ctx| {
//!     if let Some(value) = ctx.value() {
//!         ctx.target.set_attribute(ctx.node, "title", &display_value(&value));
//!     }
//!     DirectiveOutcome::Applied
//! });
//! ```

mod directives;
mod events;

pub use directives::{
    apply_directives, DirectiveContext, DirectiveHandler, DirectiveOutcome, DirectiveRegistry,
};
pub use events::bind_events;
