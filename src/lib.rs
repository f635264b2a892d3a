//! # spark-ui
//!
//! Minimal client-side UI runtime for Rust.
//!
//! ## Architecture
//!
//! Three cooperating parts share one [`App`]:
//!
//! - a reactive [`State`] container with [`Computed`] values and optional
//!   persistence
//! - a positional tree [`Reconciler`] that patches a live tree through a
//!   [`RenderTarget`]
//! - a path [`Router`] with nested-route flattening and an ordered
//!   middleware chain
//!
//! ```text
//! State write → render → parse → diff/patch → directives → events → lifecycle
//!                                       ▲
//! Location → Router → middlewares → mount
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Node ids, props, shared value helpers
//! - [`error`] - Error types for every subsystem
//! - [`config`] - Runtime configuration
//! - [`diagnostics`] - Where reported errors and notices go
//! - [`state`] - State containers, computed values, effects, the global
//!   store, persistence, event bus
//! - [`renderer`] - Virtual nodes, markup parser, reconciler, render targets
//! - [`primitives`] - Directives and event bindings over the live tree
//! - [`engine`] - The app, component definitions and registry
//! - [`pipeline`] - Mounting and the render loop
//! - [`router`] - Routes, middlewares, location adapters

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod renderer;
pub mod router;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::RuntimeConfig;

pub use diagnostics::{Diagnostic, DiagnosticSink, Level, MemorySink, TracingSink};

pub use error::{
    ConfigError, MiddlewareStage, RegistrationError, RenderError, RouteError, RuntimeError,
    StorageError,
};

pub use state::{
    use_effect, Computed, EventBus, JsonFileStorage, MemoryStorage, NotifyMode, Ref, State,
    StateChange, StateOptions, StorageProvider, Store,
};

pub use renderer::{
    materialize, parse, patch, MemoryTarget, Mutation, Reconciler, RenderTarget, SharedTarget,
    VNode,
};

pub use primitives::{DirectiveContext, DirectiveOutcome, DirectiveRegistry};

pub use engine::{
    App, AppBuilder, ComponentContext, ComponentDefinition, ComponentSource, ComponentSpec,
    Invocation, RenderScope,
};

pub use pipeline::{mount, mount_lazy, MountHandle, MountOptions};

pub use router::{
    routes_from_json, Guard, Location, MemoryLocation, Middleware, NavigationContext,
    NavigationOutcome, RouteConfig, Router, RouterMode, SharedLocation,
};
