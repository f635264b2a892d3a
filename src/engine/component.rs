//! Component definitions.
//!
//! A component is a render function plus optional setup, lifecycle hooks,
//! a lazy loader and a stylesheet. Definitions are built with a small
//! builder:
//!
//! ```ignore
//! let counter = ComponentDefinition::new()
//!     .setup(|_props, app| {
//!         ComponentContext::new(app.create_state(json!({"count": 0}), None))
//!             .method("increment", |call| {
//!                 let count = call.state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
//!                 call.state.set_key("count", json!(count + 1));
//!                 Value::Null
//!             })
//!     })
//!     .render(|scope| scope.interpolate(r#"<button data-on="click:increment">{{count}}</button>"#))
//!     .on_mount(|ctx| println!("mounted with {:?}", ctx.state.get_all()));
//!
//! app.register("Counter", counter);
//! ```
//!
//! [`ComponentDefinition::from_template`] builds the same thing from a
//! template string and a typed [`ComponentSpec`].

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use indexmap::IndexMap;

use super::app::App;
use super::expr::{self, Path};
use crate::renderer::TargetEvent;
use crate::state::{Computed, State};
use crate::types::{Props, Value};

// =============================================================================
// Types
// =============================================================================

/// Arguments passed to a component method or global handler.
pub struct Invocation<'a> {
    /// Triggering event, `None` when called from interpolation
    pub event: Option<&'a TargetEvent>,
    pub state: &'a State,
    pub props: &'a Props,
}

/// Component method or global handler.
pub type Method = Rc<dyn Fn(&Invocation<'_>) -> Value>;

/// Pure function deriving a computed value from a state snapshot.
pub type ComputeFn = Rc<dyn Fn(&Props) -> Value>;

/// Produces markup. An `Err` carries the failure message.
pub type RenderFn = Rc<dyn Fn(&RenderScope<'_>) -> Result<String, String>>;

/// Builds the context of a render instance.
pub type SetupFn = Rc<dyn Fn(&Props, &App) -> ComponentContext>;

/// Lifecycle hook.
pub type Hook = Rc<dyn Fn(&ComponentContext)>;

/// Loads a lazy component's implementation.
pub type LazyLoader = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<(), String>>>;

// =============================================================================
// Component Context
// =============================================================================

/// Per-instance state, methods and computed values produced by setup.
#[derive(Clone)]
pub struct ComponentContext {
    pub state: State,
    pub methods: IndexMap<String, Method>,
    pub computed: IndexMap<String, Computed>,
}

impl ComponentContext {
    pub fn new(state: State) -> Self {
        Self {
            state,
            methods: IndexMap::new(),
            computed: IndexMap::new(),
        }
    }

    /// Add a method (builder style).
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Value + 'static,
    {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Add a computed value (builder style).
    pub fn computed(mut self, name: impl Into<String>, computed: Computed) -> Self {
        self.computed.insert(name.into(), computed);
        self
    }

    /// Current computed values by name.
    pub fn computed_values(&self) -> Props {
        self.computed
            .iter()
            .map(|(name, computed)| (name.clone(), computed.value()))
            .collect()
    }

    /// Call a method with no event. Returns `None` if there is no such method.
    pub fn call(&self, name: &str, props: &Props) -> Option<Value> {
        let method = self.methods.get(name)?;
        Some(method(&Invocation {
            event: None,
            state: &self.state,
            props,
        }))
    }

    /// Resolve an interpolation expression.
    ///
    /// Computed values first, then state, then a method of that exact name
    /// called with no event. Null results count as unresolved.
    pub fn lookup(&self, expr: &str, props: &Props) -> Option<Value> {
        let path = Path::parse(expr)?;

        if let Some(computed) = self.computed.get(path.head()) {
            if let Some(value) = expr::walk(&computed.value(), path.tail()).filter(|v| !v.is_null()) {
                return Some(value);
            }
        }

        let from_state = self.state.with(|snapshot| path.resolve(&[snapshot]));
        if let Some(value) = from_state.filter(|v| !v.is_null()) {
            return Some(value);
        }

        if path.tail().is_empty() {
            return self.call(path.head(), props).filter(|v| !v.is_null());
        }
        None
    }

    /// Release every computed subscription.
    pub fn dispose(&self) {
        for computed in self.computed.values() {
            computed.dispose();
        }
    }
}

/// What a render function sees.
pub struct RenderScope<'a> {
    pub props: &'a Props,
    pub context: &'a ComponentContext,
    /// Directive attribute prefix (`data-z-`)
    pub prefix: &'a str,
}

impl RenderScope<'_> {
    pub fn state(&self) -> &State {
        &self.context.state
    }

    /// State field, falling back to a prop of the same name.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.context.state.get(key).or_else(|| self.props.get(key).cloned())
    }

    /// Interpolate `{{ expr }}` placeholders against this scope.
    ///
    /// Resolved values are markup-escaped. Placeholders naming a
    /// list-expansion item are left for the directive pass.
    pub fn interpolate(&self, template: &str) -> String {
        let bindings = expr::loop_bindings(template, self.prefix);
        expr::interpolate_markup(template, &bindings, |e| self.context.lookup(e, self.props))
    }
}

// =============================================================================
// Lifecycles
// =============================================================================

/// Lifecycle hooks of a component.
#[derive(Clone, Default)]
pub struct Lifecycles {
    pub on_mount: Option<Hook>,
    pub on_update: Option<Hook>,
    pub on_unmount: Option<Hook>,
}

// =============================================================================
// Component Definition
// =============================================================================

/// Everything the registry knows about a component.
#[derive(Clone, Default)]
pub struct ComponentDefinition {
    pub render: Option<RenderFn>,
    pub setup: Option<SetupFn>,
    pub lifecycles: Lifecycles,
    pub lazy: Option<LazyLoader>,
    pub style: Option<String>,
}

impl ComponentDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Infallible render function.
    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&RenderScope<'_>) -> String + 'static,
    {
        self.render = Some(Rc::new(move |scope: &RenderScope<'_>| Ok::<_, String>(render(scope))));
        self
    }

    /// Render function that may fail.
    pub fn try_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&RenderScope<'_>) -> Result<String, String> + 'static,
    {
        self.render = Some(Rc::new(render));
        self
    }

    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&Props, &App) -> ComponentContext + 'static,
    {
        self.setup = Some(Rc::new(setup));
        self
    }

    pub fn on_mount<F: Fn(&ComponentContext) + 'static>(mut self, hook: F) -> Self {
        self.lifecycles.on_mount = Some(Rc::new(hook));
        self
    }

    pub fn on_update<F: Fn(&ComponentContext) + 'static>(mut self, hook: F) -> Self {
        self.lifecycles.on_update = Some(Rc::new(hook));
        self
    }

    pub fn on_unmount<F: Fn(&ComponentContext) + 'static>(mut self, hook: F) -> Self {
        self.lifecycles.on_unmount = Some(Rc::new(hook));
        self
    }

    /// Mark the component lazy: `loader` runs before its first routed render.
    pub fn lazy<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> LocalBoxFuture<'static, Result<(), String>> + 'static,
    {
        self.lazy = Some(Rc::new(loader));
        self
    }

    pub fn style(mut self, css: impl Into<String>) -> Self {
        self.style = Some(css.into());
        self
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy.is_some()
    }

    /// Run setup, or create an empty state when there is none.
    pub fn create_context(&self, props: &Props, app: &App) -> ComponentContext {
        match &self.setup {
            Some(setup) => setup(props, app),
            None => ComponentContext::new(app.create_state(Value::Object(Props::new()), None)),
        }
    }

    /// Build a component from a template and a typed descriptor.
    ///
    /// Setup creates the state from `data` and one computed value per entry
    /// of `computed`. Render interpolates the template; interpolated values
    /// are escaped, so a `"` or `<` in state shows up as text instead of
    /// changing the markup.
    pub fn from_template(template: impl Into<String>, spec: ComponentSpec) -> Self {
        let template: String = template.into();
        let ComponentSpec {
            data,
            methods,
            computed,
            lifecycles,
            lazy,
            persist_key,
        } = spec;

        let setup = move |_props: &Props, app: &App| {
            let state = app.create_state(Value::Object(data.clone()), persist_key.as_deref());
            let computed = computed
                .iter()
                .map(|(name, compute)| {
                    let compute = compute.clone();
                    (name.clone(), app.computed(&state, move |s| compute(s), true))
                })
                .collect();
            ComponentContext {
                state,
                methods: methods.clone(),
                computed,
            }
        };

        Self {
            render: Some(Rc::new(move |scope: &RenderScope<'_>| {
                Ok::<_, String>(scope.interpolate(&template))
            })),
            setup: Some(Rc::new(setup)),
            lifecycles,
            lazy,
            style: None,
        }
    }
}

/// Typed component descriptor used by [`ComponentDefinition::from_template`].
#[derive(Clone, Default)]
pub struct ComponentSpec {
    /// Initial state
    pub data: Props,
    pub methods: IndexMap<String, Method>,
    pub computed: IndexMap<String, ComputeFn>,
    pub lifecycles: Lifecycles,
    pub lazy: Option<LazyLoader>,
    /// Persist the state under this key
    pub persist_key: Option<String>,
}

impl ComponentSpec {
    pub fn new(data: Props) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Value + 'static,
    {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    pub fn computed<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Props) -> Value + 'static,
    {
        self.computed.insert(name.into(), Rc::new(compute));
        self
    }

    pub fn persist(mut self, key: impl Into<String>) -> Self {
        self.persist_key = Some(key.into());
        self
    }
}
