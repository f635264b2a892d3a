//! App context - everything one runtime instance owns.
//!
//! An [`App`] is created once and handed to the render loop, the router and
//! component setup. Independent apps share nothing, so tests can build as
//! many as they like.
//!
//! # Example
//!
//! ```ignore
//! let target: SharedTarget = Rc::new(RefCell::new(MemoryTarget::new()));
//! let app = App::builder(target)
//!     .storage(Rc::new(MemoryStorage::new()))
//!     .diagnostics(Rc::new(MemorySink::new()))
//!     .config(RuntimeConfig::from_json(r#"{"router_mode":"fragment"}"#)?)
//!     .build();
//!
//! app.register("Home", ComponentDefinition::new().render(|_| "<h1>Home</h1>".into()));
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use indexmap::IndexMap;

use super::component::{ComponentDefinition, Invocation, Method};
use super::registry::Registry;
use crate::config::RuntimeConfig;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{RenderError, RuntimeError};
use crate::primitives::{DirectiveContext, DirectiveOutcome, DirectiveRegistry};
use crate::renderer::SharedTarget;
use crate::state::{Computed, EventBus, Ref, State, StateOptions, StorageProvider, Store};
use crate::types::{props_from, Props, Value};

struct AppInner {
    target: SharedTarget,
    config: RuntimeConfig,
    registry: Registry,
    directives: RefCell<DirectiveRegistry>,
    handlers: RefCell<IndexMap<String, Method>>,
    storage: Option<Rc<dyn StorageProvider>>,
    diagnostics: Rc<dyn DiagnosticSink>,
    events: EventBus,
    store: RefCell<Option<Store>>,
    plugins: RefCell<Vec<String>>,
}

/// Handle to a runtime instance. Clones share the same instance.
#[derive(Clone)]
pub struct App {
    inner: Rc<AppInner>,
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`App`].
pub struct AppBuilder {
    target: SharedTarget,
    config: RuntimeConfig,
    storage: Option<Rc<dyn StorageProvider>>,
    diagnostics: Rc<dyn DiagnosticSink>,
}

impl AppBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// The single storage provider used by persisted state.
    pub fn storage(mut self, storage: Rc<dyn StorageProvider>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the default tracing sink.
    pub fn diagnostics(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn build(self) -> App {
        App {
            inner: Rc::new(AppInner {
                target: self.target,
                config: self.config,
                registry: Registry::new(),
                directives: RefCell::new(DirectiveRegistry::with_builtins()),
                handlers: RefCell::new(IndexMap::new()),
                storage: self.storage,
                diagnostics: self.diagnostics,
                events: EventBus::new(),
                store: RefCell::new(None),
                plugins: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl App {
    pub fn builder(target: SharedTarget) -> AppBuilder {
        AppBuilder {
            target,
            config: RuntimeConfig::default(),
            storage: None,
            diagnostics: Rc::new(TracingSink),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn target(&self) -> &SharedTarget {
        &self.inner.target
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Snapshot of the directive registry.
    pub fn directives(&self) -> DirectiveRegistry {
        self.inner.directives.borrow().clone()
    }

    pub fn storage(&self) -> Option<&Rc<dyn StorageProvider>> {
        self.inner.storage.as_ref()
    }

    pub fn diagnostics(&self) -> Rc<dyn DiagnosticSink> {
        self.inner.diagnostics.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Whether two handles point at the same instance.
    pub fn ptr_eq(&self, other: &App) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    pub fn info(&self, message: &str) {
        self.inner.diagnostics.info(message);
    }

    pub fn report(&self, error: impl Into<RuntimeError>) {
        self.inner.diagnostics.error(&error.into());
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    /// Create a state container.
    ///
    /// With a persist key and a storage provider, a stored object under the
    /// key replaces `initial`. Without a provider the key is ignored.
    pub fn create_state(&self, initial: Value, persist_key: Option<&str>) -> State {
        let persist = match (persist_key, &self.inner.storage) {
            (Some(key), Some(storage)) => Some((key.to_string(), storage.clone())),
            (Some(key), None) => {
                tracing::debug!(key, "persist key ignored, no storage provider");
                None
            }
            _ => None,
        };
        State::with_options(
            props_from(initial),
            StateOptions {
                mode: self.inner.config.notify_mode,
                persist,
                diagnostics: self.inner.diagnostics.clone(),
            },
        )
    }

    /// Create a single-value container.
    pub fn create_ref(&self, initial: Value) -> Ref {
        Ref::from_state(self.create_state(Value::Object(Props::new()), None), initial)
    }

    /// Derive a computed container from `source`.
    pub fn computed<F>(&self, source: &State, compute: F, memoize: bool) -> Computed
    where
        F: Fn(&Props) -> Value + 'static,
    {
        Computed::new(source, compute, memoize)
    }

    /// Create the app's global store over a fresh container.
    ///
    /// Replaces any earlier store returned by [`store`](Self::store).
    pub fn create_store(&self, initial: Value) -> Store {
        let store = Store::new(self.create_state(initial, None));
        *self.inner.store.borrow_mut() = Some(store.clone());
        store
    }

    /// The global store, once created.
    pub fn store(&self) -> Option<Store> {
        self.inner.store.borrow().clone()
    }

    // -------------------------------------------------------------------------
    // Components
    // -------------------------------------------------------------------------

    /// Register a component. Invalid definitions are reported and skipped.
    ///
    /// Returns whether the component was registered.
    pub fn register(&self, name: &str, definition: ComponentDefinition) -> bool {
        match self.inner.registry.register(name, definition) {
            Ok(()) => true,
            Err(err) => {
                self.report(err);
                false
            }
        }
    }

    /// Run the lazy loader of `name` unless it already completed.
    pub fn load_component(&self, name: &str) -> LocalBoxFuture<'static, Result<(), RenderError>> {
        let app = self.clone();
        let name = name.to_string();
        async move {
            let Some(definition) = app.registry().get(&name) else {
                return Err(RenderError::ComponentNotFound(name));
            };
            let Some(loader) = definition.lazy.clone() else {
                return Ok(());
            };
            if app.registry().is_loaded(&name) {
                return Ok(());
            }

            tracing::debug!(component = %name, "loading lazy component");
            loader().await.map_err(|message| RenderError::LazyLoad {
                component: name.clone(),
                message,
            })?;
            app.registry().mark_loaded(&name);
            Ok(())
        }
        .boxed_local()
    }

    /// Register a directive under `directive_prefix + name`.
    pub fn register_directive<F>(&self, name: &str, handler: F)
    where
        F: Fn(&mut DirectiveContext<'_>) -> DirectiveOutcome + 'static,
    {
        self.inner.directives.borrow_mut().register(name, handler);
    }

    // -------------------------------------------------------------------------
    // Global handlers
    // -------------------------------------------------------------------------

    /// Register a handler that event bindings may name when no component
    /// method matches.
    pub fn register_handler<F>(&self, name: &str, handler: F)
    where
        F: Fn(&Invocation<'_>) -> Value + 'static,
    {
        self.inner
            .handlers
            .borrow_mut()
            .insert(name.to_string(), Rc::new(handler));
    }

    pub fn handler(&self, name: &str) -> Option<Method> {
        self.inner.handlers.borrow().get(name).cloned()
    }

    // -------------------------------------------------------------------------
    // Plugins
    // -------------------------------------------------------------------------

    /// Run a plugin once against this app.
    ///
    /// A second plugin under the same name is skipped. Returns whether the
    /// plugin ran.
    pub fn use_plugin<F>(&self, name: &str, plugin: F) -> bool
    where
        F: FnOnce(&App),
    {
        if self.inner.plugins.borrow().iter().any(|p| p == name) {
            self.info(&format!("Plugin \"{name}\" already installed"));
            return false;
        }
        self.inner.plugins.borrow_mut().push(name.to_string());
        plugin(self);
        true
    }

    /// Installed plugin names in installation order.
    pub fn plugins(&self) -> Vec<String> {
        self.inner.plugins.borrow().clone()
    }
}
