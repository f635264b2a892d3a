//! Mount API - render loop of one component instance.
//!
//! Mounting runs the component's setup, performs the first pass, and
//! subscribes the instance to its state so every write re-renders.
//!
//! # Pass
//!
//! ```text
//! render → same markup as last pass? ──yes──► re-apply directives + events
//!             │ no
//!             ▼
//!          parse → patch → directives → events → on_mount / on_update
//! ```
//!
//! When a directive changed the structure (`for`, a false `if`), the live
//! tree is read back as the previous tree and the next pass always patches.
//!
//! # Example
//!
//! ```ignore
//! use spark_ui::pipeline::{mount, MountOptions};
//!
//! let handle = mount(&app, "Counter", Props::new(), container, MountOptions::default())
//!     .ok_or("no such component")?;
//!
//! handle.state().set_key("count", json!(5)); // re-renders synchronously
//!
//! handle.unmount(); // on_unmount, container cleared
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

use super::lifecycle::{self, LifecycleTracker};
use crate::engine::{App, ComponentContext, ComponentDefinition, RenderScope};
use crate::error::RenderError;
use crate::primitives::{apply_directives, bind_events};
use crate::renderer::{materialize, parse, Reconciler, RenderTarget, VNode};
use crate::state::State;
use crate::types::{Cleanup, NodeId, Props};

// =============================================================================
// Options
// =============================================================================

/// Per-mount options.
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    /// Markup shown when a render fails. Overrides the config default.
    pub fallback: Option<String>,
    /// Markup shown while a lazy component loads. Overrides the config
    /// default.
    pub loading: Option<String>,
}

impl MountOptions {
    pub fn with_fallback(markup: impl Into<String>) -> Self {
        Self {
            fallback: Some(markup.into()),
            ..Self::default()
        }
    }

    /// Set the loading markup (builder style).
    pub fn loading(mut self, markup: impl Into<String>) -> Self {
        self.loading = Some(markup.into());
        self
    }

    /// Fallback markup, else the config default.
    pub fn fallback_for(&self, app: &App) -> Option<String> {
        self.fallback
            .clone()
            .or_else(|| app.config().fallback_markup.clone())
    }

    /// Loading markup, else the config default.
    pub fn loading_for(&self, app: &App) -> Option<String> {
        self.loading
            .clone()
            .or_else(|| app.config().loading_markup.clone())
    }
}

/// Replace the content of `container` with `markup`.
///
/// Markup without a top-level element is shown as text.
pub(crate) fn show_markup(target: &mut dyn RenderTarget, container: NodeId, markup: &str) {
    target.clear_children(container);
    let tree = parse(markup).unwrap_or_else(|| VNode::text(markup));
    let node = materialize(target, &tree);
    target.append_child(container, node);
}

// =============================================================================
// Render Instance
// =============================================================================

struct RenderInstance {
    app: App,
    name: String,
    definition: Rc<ComponentDefinition>,
    props: Props,
    context: ComponentContext,
    container: NodeId,
    fallback: Option<String>,
    reconciler: RefCell<Reconciler>,
    previous_markup: RefCell<Option<String>>,
    lifecycle: RefCell<LifecycleTracker>,
    subscription: RefCell<Option<Cleanup>>,
    active: Cell<bool>,
    rendering: Cell<bool>,
    dirty: Cell<bool>,
}

impl RenderInstance {
    /// Run passes until no write happened during the last one.
    ///
    /// A write from a hook, directive or listener while a pass is running
    /// schedules one more pass instead of nesting.
    fn update(&self) {
        if !self.active.get() {
            return;
        }
        if self.rendering.replace(true) {
            self.dirty.set(true);
            return;
        }
        loop {
            self.dirty.set(false);
            self.pass();
            if !self.dirty.get() || !self.active.get() {
                break;
            }
        }
        self.rendering.set(false);
    }

    fn pass(&self) {
        let Some(render) = self.definition.render.clone() else {
            self.fail(RenderError::render(&self.name, "no render function"));
            return;
        };
        let prefix = self.app.config().directive_prefix.clone();
        let scope = RenderScope {
            props: &self.props,
            context: &self.context,
            prefix: &prefix,
        };
        let markup = match render(&scope) {
            Ok(markup) => markup,
            Err(message) => {
                self.fail(RenderError::render(&self.name, message));
                return;
            }
        };

        if self.previous_markup.borrow().as_deref() == Some(markup.as_str()) {
            tracing::trace!(component = %self.name, "markup unchanged, patch skipped");
            self.post_patch();
            return;
        }

        let Some(tree) = parse(&markup) else {
            self.fail(RenderError::render(&self.name, "markup has no top-level element"));
            return;
        };
        {
            let mut target = self.app.target().borrow_mut();
            self.reconciler
                .borrow_mut()
                .render(&mut *target, self.container, tree);
        }
        *self.previous_markup.borrow_mut() = Some(markup);

        self.post_patch();

        let event = self.lifecycle.borrow_mut().after_patch();
        lifecycle::dispatch(
            &self.app,
            &self.name,
            &self.definition.lifecycles,
            event,
            &self.context,
        );
    }

    /// Directives, then event bindings, over the live tree.
    fn post_patch(&self) {
        let snapshot = self.context.state.get_all();
        let computed = self.context.computed_values();
        let scope = [&computed, &snapshot, &self.props];
        let directives = self.app.directives();
        let prefix = self.app.config().directive_prefix.clone();

        let mut target = self.app.target().borrow_mut();
        let structural = apply_directives(
            &mut *target,
            self.container,
            &directives,
            &prefix,
            &self.context.state,
            &scope,
        );
        bind_events(&mut *target, self.container, &self.app, &self.context, &self.props);

        if structural {
            // Markup no longer determines the live tree; diff against what is there
            self.reconciler.borrow_mut().adopt(&*target, self.container);
            *self.previous_markup.borrow_mut() = None;
        }
    }

    /// Report a failed pass and show the fallback, if any.
    ///
    /// Without a fallback the previously rendered tree stays.
    fn fail(&self, error: RenderError) {
        self.app.report(error);
        let Some(fallback) = &self.fallback else {
            return;
        };

        show_markup(&mut *self.app.target().borrow_mut(), self.container, fallback);
        self.reconciler.borrow_mut().invalidate();
        *self.previous_markup.borrow_mut() = None;
    }

    fn teardown(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(release) = self.subscription.borrow_mut().take() {
            release();
        }
        self.context.dispose();

        let event = self.lifecycle.borrow_mut().teardown();
        if let Some(event) = event {
            lifecycle::dispatch(
                &self.app,
                &self.name,
                &self.definition.lifecycles,
                event,
                &self.context,
            );
        }

        let mut target = self.app.target().borrow_mut();
        self.reconciler
            .borrow_mut()
            .clear(&mut *target, self.container);
        *self.previous_markup.borrow_mut() = None;
        tracing::debug!(component = %self.name, container = %self.container, "unmounted");
    }
}

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount`]. Dropping it unmounts.
pub struct MountHandle {
    instance: Rc<RenderInstance>,
}

impl MountHandle {
    /// Release the state subscription, dispose computed values, fire
    /// `on_unmount` and clear the container.
    pub fn unmount(self) {
        self.instance.teardown();
    }

    /// Run a pass now, as a state write would.
    pub fn refresh(&self) {
        self.instance.update();
    }

    pub fn state(&self) -> &State {
        &self.instance.context.state
    }

    pub fn context(&self) -> &ComponentContext {
        &self.instance.context
    }

    pub fn container(&self) -> NodeId {
        self.instance.container
    }

    pub fn component(&self) -> &str {
        &self.instance.name
    }

    pub fn props(&self) -> &Props {
        &self.instance.props
    }

    /// Whether the first pass succeeded and the instance is still live.
    pub fn is_mounted(&self) -> bool {
        self.instance.active.get() && self.instance.lifecycle.borrow().is_mounted()
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.instance.teardown();
    }
}

// =============================================================================
// Mount Function
// =============================================================================

/// Mount component `name` into `container`.
///
/// Returns `None` (after reporting) if no such component is registered. A
/// failing first render still returns a handle; the next state write
/// retries.
pub fn mount(
    app: &App,
    name: &str,
    props: Props,
    container: NodeId,
    options: MountOptions,
) -> Option<MountHandle> {
    let Some(definition) = app.registry().get(name) else {
        app.report(RenderError::ComponentNotFound(name.to_string()));
        return None;
    };
    if app.registry().needs_load(name) {
        tracing::debug!(component = name, "mounting lazy component before its loader ran");
    }

    let context = definition.create_context(&props, app);
    let fallback = options.fallback_for(app);

    let instance = Rc::new(RenderInstance {
        app: app.clone(),
        name: name.to_string(),
        definition,
        props,
        context,
        container,
        fallback,
        reconciler: RefCell::new(Reconciler::new()),
        previous_markup: RefCell::new(None),
        lifecycle: RefCell::new(LifecycleTracker::new()),
        subscription: RefCell::new(None),
        active: Cell::new(true),
        rendering: Cell::new(false),
        dirty: Cell::new(false),
    });

    // Subscribed before the first pass so writes from on_mount re-render
    let weak = Rc::downgrade(&instance);
    let subscription = instance.context.state.subscribe(move |_| {
        if let Some(instance) = weak.upgrade() {
            instance.update();
        }
    });
    *instance.subscription.borrow_mut() = Some(subscription);

    tracing::debug!(component = name, %container, "mounting");
    instance.update();
    Some(MountHandle { instance })
}

/// Load component `name` if it is lazy, then mount it.
///
/// While the loader runs, the loading markup (if any) fills the container.
/// A failed load is reported and shows the fallback markup. Without a
/// fallback, loading markup is cleared and any other content stays.
pub fn mount_lazy(
    app: &App,
    name: &str,
    props: Props,
    container: NodeId,
    options: MountOptions,
) -> LocalBoxFuture<'static, Option<MountHandle>> {
    let app = app.clone();
    let name = name.to_string();
    async move {
        if app.registry().needs_load(&name) {
            let loading = options.loading_for(&app);
            if let Some(markup) = &loading {
                show_markup(&mut *app.target().borrow_mut(), container, markup);
            }
            if let Err(err) = app.load_component(&name).await {
                app.report(err);
                show_failed_load(&app, container, &options, loading.is_some());
                return None;
            }
        }
        mount(&app, &name, props, container, options)
    }
    .boxed_local()
}

/// After a failed lazy load: fallback markup, else clear the loading markup.
pub(crate) fn show_failed_load(app: &App, container: NodeId, options: &MountOptions, loading_shown: bool) {
    let mut target = app.target().borrow_mut();
    match options.fallback_for(app) {
        Some(fallback) => show_markup(&mut *target, container, &fallback),
        None if loading_shown => target.clear_children(container),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::renderer::{dispatch_event, find_with_attribute, MemoryTarget, Mutation, SharedTarget};
    use crate::types::Value;
    use serde_json::json;

    struct Fixture {
        target: Rc<RefCell<MemoryTarget>>,
        container: NodeId,
        app: App,
        sink: Rc<MemorySink>,
    }

    fn fixture() -> Fixture {
        let mut memory = MemoryTarget::new();
        let container = memory.create_container("main");
        let target = Rc::new(RefCell::new(memory));
        let shared: SharedTarget = target.clone();
        let sink = Rc::new(MemorySink::new());
        let app = App::builder(shared).diagnostics(sink.clone()).build();
        Fixture {
            target,
            container,
            app,
            sink,
        }
    }

    fn counter() -> ComponentDefinition {
        ComponentDefinition::new()
            .setup(|_, app| {
                ComponentContext::new(app.create_state(json!({"count": 0}), None)).method(
                    "increment",
                    |call| {
                        let count = call.state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
                        call.state.set_key("count", json!(count + 1));
                        Value::Null
                    },
                )
            })
            .render(|scope| {
                scope.interpolate(r#"<div><button data-on="click:increment">+</button><span>{{count}}</span></div>"#)
            })
    }

    #[test]
    fn test_mount_renders_and_rerenders() {
        let f = fixture();
        f.app.register("Counter", counter());
        let handle = mount(&f.app, "Counter", Props::new(), f.container, MountOptions::default()).unwrap();

        assert!(handle.is_mounted());
        assert!(f.target.borrow().inner_markup(f.container).contains("<span>0</span>"));

        let button = find_with_attribute(&*f.target.borrow(), f.container, "data-on")[0];
        let shared: SharedTarget = f.target.clone();
        dispatch_event(&shared, button, "click", Value::Null);

        assert_eq!(handle.state().get("count"), Some(json!(1)));
        assert!(f.target.borrow().inner_markup(f.container).contains("<span>1</span>"));
    }

    #[test]
    fn test_update_patches_minimally() {
        let f = fixture();
        f.app.register("Counter", counter());
        let handle = mount(&f.app, "Counter", Props::new(), f.container, MountOptions::default()).unwrap();
        f.target.borrow_mut().clear_mutations();

        handle.state().set_key("count", json!(7));
        let mutations = f.target.borrow_mut().take_mutations();
        assert_eq!(mutations.len(), 1);
        assert!(matches!(&mutations[0], Mutation::SetText { text, .. } if text == "7"));
    }

    #[test]
    fn test_unknown_component() {
        let f = fixture();
        assert!(mount(&f.app, "Nope", Props::new(), f.container, MountOptions::default()).is_none());
        assert_eq!(f.sink.errors(), vec!["Component \"Nope\" not found".to_string()]);
    }

    #[test]
    fn test_lifecycle_hooks() {
        let f = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (m, u, x) = (log.clone(), log.clone(), log.clone());
        f.app.register(
            "Hooked",
            ComponentDefinition::new()
                .setup(|_, app| ComponentContext::new(app.create_state(json!({"n": 0}), None)))
                .render(|scope| scope.interpolate("<p>{{n}}</p>"))
                .on_mount(move |_| m.borrow_mut().push("mount"))
                .on_update(move |_| u.borrow_mut().push("update"))
                .on_unmount(move |_| x.borrow_mut().push("unmount")),
        );

        let handle = mount(&f.app, "Hooked", Props::new(), f.container, MountOptions::default()).unwrap();
        handle.state().set_key("n", json!(1));
        handle.state().set_key("n", json!(1)); // unchanged, no notification
        handle.state().set_key("n", json!(2));
        handle.unmount();

        assert_eq!(*log.borrow(), vec!["mount", "update", "update", "unmount"]);
        assert_eq!(f.target.borrow().inner_markup(f.container), "");
    }

    #[test]
    fn test_write_from_on_mount_rerenders() {
        let f = fixture();
        f.app.register(
            "Loader",
            ComponentDefinition::new()
                .setup(|_, app| ComponentContext::new(app.create_state(json!({"ready": false}), None)))
                .render(|scope| scope.interpolate("<p>{{ready}}</p>"))
                .on_mount(|ctx| ctx.state.set_key("ready", json!(true))),
        );

        let _handle = mount(&f.app, "Loader", Props::new(), f.container, MountOptions::default()).unwrap();
        assert_eq!(f.target.borrow().inner_markup(f.container), "<p>true</p>");
    }

    #[test]
    fn test_render_error_keeps_previous_tree() {
        let f = fixture();
        f.app.register(
            "Fragile",
            ComponentDefinition::new()
                .setup(|_, app| ComponentContext::new(app.create_state(json!({"ok": true}), None)))
                .try_render(|scope| match scope.get("ok") {
                    Some(Value::Bool(true)) => Ok("<p>fine</p>".into()),
                    _ => Err("broken".into()),
                }),
        );

        let handle = mount(&f.app, "Fragile", Props::new(), f.container, MountOptions::default()).unwrap();
        handle.state().set_key("ok", json!(false));

        assert_eq!(f.target.borrow().inner_markup(f.container), "<p>fine</p>");
        assert_eq!(f.sink.errors(), vec!["Render error in \"Fragile\": broken".to_string()]);
    }

    #[test]
    fn test_render_error_shows_fallback() {
        let f = fixture();
        f.app.register(
            "Broken",
            ComponentDefinition::new().try_render(|_| Err("nope".into())),
        );

        let handle = mount(
            &f.app,
            "Broken",
            Props::new(),
            f.container,
            MountOptions::with_fallback("<p>Something went wrong</p>"),
        )
        .unwrap();

        assert!(!handle.is_mounted());
        assert_eq!(
            f.target.borrow().inner_markup(f.container),
            "<p>Something went wrong</p>"
        );
    }

    #[test]
    fn test_drop_unmounts() {
        let f = fixture();
        f.app.register("Counter", counter());
        let handle = mount(&f.app, "Counter", Props::new(), f.container, MountOptions::default()).unwrap();
        let state = handle.state().clone();
        assert_eq!(state.listener_count(), 1);

        drop(handle);
        assert_eq!(state.listener_count(), 0);
        assert!(f.target.borrow().children(f.container).is_empty());
    }

    #[test]
    fn test_for_directive_tracks_list_changes() {
        let f = fixture();
        f.app.register(
            "List",
            ComponentDefinition::new()
                .setup(|_, app| ComponentContext::new(app.create_state(json!({"items": ["a", "b"]}), None)))
                .render(|scope| scope.interpolate(r#"<ul><li data-z-for="item in items">{{item}}</li></ul>"#)),
        );

        let handle = mount(&f.app, "List", Props::new(), f.container, MountOptions::default()).unwrap();
        assert_eq!(f.target.borrow().inner_markup(f.container), "<ul><li>a</li><li>b</li></ul>");

        handle.state().set_key("items", json!(["c"]));
        assert_eq!(f.target.borrow().inner_markup(f.container), "<ul><li>c</li></ul>");
    }

    #[test]
    fn test_typing_next_to_a_list_keeps_the_input() {
        let f = fixture();
        f.app.register(
            "Draft",
            ComponentDefinition::new()
                .setup(|_, app| {
                    ComponentContext::new(app.create_state(json!({"draft": "", "todos": ["a", "b"]}), None))
                })
                .render(|scope| {
                    scope.interpolate(
                        r#"<div><input data-z-model="draft"><ul><li data-z-for="t in todos">{{t}}</li></ul></div>"#,
                    )
                }),
        );

        let handle = mount(&f.app, "Draft", Props::new(), f.container, MountOptions::default()).unwrap();
        let input = f.target.borrow().find_by_tag(f.container, "input").unwrap();
        let root = f.target.borrow().children(f.container)[0];
        f.target.borrow_mut().clear_mutations();

        let shared: SharedTarget = f.target.clone();
        crate::renderer::input_value(&shared, input, "m");

        assert_eq!(handle.state().get("draft"), Some(json!("m")));
        assert_eq!(f.target.borrow().find_by_tag(f.container, "input"), Some(input));
        // Only the list was touched
        assert!(!f.target.borrow().mutations().iter().any(|m| matches!(
            m,
            Mutation::RemoveChild { parent, .. } | Mutation::ReplaceChild { parent, .. }
                if *parent == f.container || *parent == root
        )));
        assert_eq!(
            f.target.borrow().inner_markup(f.container),
            r#"<div><input data-z-model="draft"></input><ul><li>a</li><li>b</li></ul></div>"#
        );

        handle.state().set_key("todos", json!(["a", "b", "c"]));
        assert_eq!(f.target.borrow().find_by_tag(f.container, "input"), Some(input));
        assert!(f.target.borrow().inner_markup(f.container).ends_with("<ul><li>a</li><li>b</li><li>c</li></ul></div>"));
    }

    #[test]
    fn test_single_quoted_list_binding() {
        let f = fixture();
        f.app.register(
            "Quoted",
            ComponentDefinition::new()
                .setup(|_, app| ComponentContext::new(app.create_state(json!({"items": ["a", "b"]}), None)))
                .render(|scope| scope.interpolate("<ul><li data-z-for='item in items'>{{item}}</li></ul>")),
        );

        let _handle = mount(&f.app, "Quoted", Props::new(), f.container, MountOptions::default()).unwrap();
        assert_eq!(f.target.borrow().inner_markup(f.container), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_mount_lazy_shows_loading_until_loaded() {
        use futures::channel::oneshot;
        use futures::executor::LocalPool;
        use futures::task::LocalSpawnExt;

        let f = fixture();
        let (tx, rx) = oneshot::channel::<()>();
        let rx = RefCell::new(Some(rx));
        f.app.register(
            "Chart",
            ComponentDefinition::new()
                .render(|_| "<canvas>chart</canvas>".into())
                .lazy(move || {
                    let rx = rx.borrow_mut().take();
                    async move {
                        match rx {
                            Some(rx) => rx.await.map_err(|_| "cancelled".to_string()),
                            None => Ok(()),
                        }
                    }
                    .boxed_local()
                }),
        );

        let mut pool = LocalPool::new();
        let slot = Rc::new(RefCell::new(None));
        let out = slot.clone();
        let pending = mount_lazy(
            &f.app,
            "Chart",
            Props::new(),
            f.container,
            MountOptions::default().loading("Loading..."),
        );
        pool.spawner()
            .spawn_local(async move {
                *out.borrow_mut() = pending.await;
            })
            .unwrap();

        pool.run_until_stalled();
        assert_eq!(f.target.borrow().inner_markup(f.container), "Loading...");

        tx.send(()).unwrap();
        pool.run_until_stalled();
        assert!(slot.borrow().as_ref().is_some_and(|handle| handle.is_mounted()));
        assert_eq!(f.target.borrow().inner_markup(f.container), "<canvas>chart</canvas>");
    }

    #[test]
    fn test_mount_lazy_failure_shows_fallback() {
        let f = fixture();
        f.app.register(
            "Chart",
            ComponentDefinition::new()
                .render(|_| "<canvas></canvas>".into())
                .lazy(|| async { Err::<(), _>("offline".to_string()) }.boxed_local()),
        );

        let options = MountOptions::with_fallback("<p>Try again</p>").loading("<p>Loading</p>");
        let handle = futures::executor::block_on(mount_lazy(&f.app, "Chart", Props::new(), f.container, options));

        assert!(handle.is_none());
        assert_eq!(f.target.borrow().inner_markup(f.container), "<p>Try again</p>");
        assert!(f.sink.errors()[0].contains("offline"));
    }

    #[test]
    fn test_show_reapplied_on_identical_markup() {
        let f = fixture();
        f.app.register(
            "Panel",
            ComponentDefinition::new()
                .setup(|_, app| ComponentContext::new(app.create_state(json!({"open": true}), None)))
                .render(|_| r#"<section><p data-z-show="open">body</p></section>"#.into()),
        );

        let handle = mount(&f.app, "Panel", Props::new(), f.container, MountOptions::default()).unwrap();
        let p = f.target.borrow().find_by_tag(f.container, "p").unwrap();
        assert!(!f.target.borrow().is_hidden(p));

        handle.state().set_key("open", json!(false));
        assert!(f.target.borrow().is_hidden(p));
    }
}
