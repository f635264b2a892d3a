//! Engine - app context, components, and the expression language.
//!
//! The engine owns everything a render loop needs to turn a component name
//! into markup:
//! - [`App`]: the context one runtime instance is built around (registry,
//!   directives, global handlers, storage, diagnostics, event bus, plugins)
//! - [`Registry`]: name to [`ComponentDefinition`], with lazy-load tracking
//! - [`ComponentContext`]: per-instance state, methods and computed values
//! - [`expr`]: dotted-path lookups and `{{ }}` interpolation
//! - [`ComponentSource`]: `<template>`/`<script>`/`<style>` section scan
//!
//! # Architecture
//!
//! ```text
//! ComponentDefinition ──setup(props, app)──► ComponentContext
//!        │                                        │
//!        └──render(RenderScope)──► markup ◄───────┘ (interpolation lookups)
//! ```
//!
//! There is no process-wide runtime. Build as many [`App`]s as you need.

mod app;
mod component;
pub mod expr;
mod registry;
mod source;

pub use app::{App, AppBuilder};
pub use component::{
    ComponentContext, ComponentDefinition, ComponentSpec, ComputeFn, Hook, Invocation,
    LazyLoader, Lifecycles, Method, RenderFn, RenderScope, SetupFn,
};
pub use registry::Registry;
pub use source::ComponentSource;
