//! Router - navigation pipeline.
//!
//! ```text
//! Idle → Matching → GlobalMiddleware → RouteMiddleware → (LazyLoad) → Rendered
//!                          │                  │
//!                          └──── Aborted ─────┘   (falsy guard)
//!                          └──── Redirected ──┘   (string guard, new navigation)
//! ```
//!
//! With loading markup configured, a lazy component's loader runs with the
//! loading markup in place of the current view.
//!
//! Every resolution takes a new generation. After each suspension point
//! (middleware, lazy load) the navigation checks that its generation is still
//! the latest; a stale one returns [`NavigationOutcome::Superseded`] without
//! rendering or redirecting.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use indexmap::IndexMap;

use super::history::{
    current_path, fragment_path, normalize_path, parse_query, split_query, RouterMode,
    SharedLocation,
};
use super::middleware::{Guard, Middleware, NavigationContext};
use super::table::{RouteConfig, RouteEntry, RouteTable};
use crate::engine::App;
use crate::error::{MiddlewareStage, RenderError, RuntimeError};
use crate::pipeline::mount::{show_failed_load, show_markup};
use crate::pipeline::{mount, MountHandle, MountOptions};
use crate::types::{NodeId, Props};

/// How a navigation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The component was mounted
    Rendered { path: String, component: String },
    /// A middleware returned a falsy result
    Aborted { stage: MiddlewareStage },
    /// A middleware redirected; `outcome` is the redirected navigation's
    Redirected {
        to: String,
        outcome: Box<NavigationOutcome>,
    },
    /// A newer navigation started before this one finished
    Superseded,
    /// Lazy load, mount, or redirect limit failure (already reported)
    Failed,
}

impl NavigationOutcome {
    /// Outcome at the end of any redirect chain.
    pub fn last(&self) -> &NavigationOutcome {
        match self {
            NavigationOutcome::Redirected { outcome, .. } => outcome.last(),
            other => other,
        }
    }
}

struct RouterInner {
    app: App,
    container: NodeId,
    location: SharedLocation,
    table: RefCell<RouteTable>,
    global: RefCell<Vec<Middleware>>,
    generation: Cell<u64>,
    options: RefCell<MountOptions>,
    current: RefCell<Option<MountHandle>>,
    current_path: RefCell<Option<String>>,
}

/// Path router rendering into one container. Clones share the router.
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl Router {
    /// Create a router. Nothing renders until the first navigation or
    /// [`handle_location_change`](Self::handle_location_change).
    pub fn new(app: &App, container: NodeId, location: SharedLocation) -> Self {
        Self {
            inner: Rc::new(RouterInner {
                app: app.clone(),
                container,
                location,
                table: RefCell::new(RouteTable::new()),
                global: RefCell::new(Vec::new()),
                generation: Cell::new(0),
                options: RefCell::new(MountOptions::default()),
                current: RefCell::new(None),
                current_path: RefCell::new(None),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Flatten and register routes. Invalid patterns are reported and skipped.
    pub fn add_routes(&self, routes: &IndexMap<String, RouteConfig>) {
        let errors = self.inner.table.borrow_mut().add(routes);
        for error in errors {
            self.inner.app.report(error);
        }
    }

    /// Register a global middleware. Global middlewares run before route
    /// middlewares, in registration order.
    pub fn before_each(&self, middleware: Middleware) {
        self.inner.global.borrow_mut().push(middleware);
    }

    /// Options for every component the router mounts: fallback markup, and
    /// loading markup shown while a lazy route component loads.
    pub fn set_mount_options(&self, options: MountOptions) {
        *self.inner.options.borrow_mut() = options;
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Update the location and resolve `path` (which may carry a `?query`).
    ///
    /// Fragment mode writes the fragment; history mode pushes, or replaces
    /// with `replace`.
    pub fn navigate(&self, path: &str, replace: bool) -> LocalBoxFuture<'static, NavigationOutcome> {
        self.navigate_with(path.to_string(), replace, 0)
    }

    /// Resolve the current location, after a host-driven change (fragment
    /// change, history traversal) or for the initial render.
    pub fn handle_location_change(&self) -> LocalBoxFuture<'static, NavigationOutcome> {
        let (path, query) = {
            let location = self.inner.location.borrow();
            current_path(self.mode(), &*location, &self.inner.app.config().base_path)
        };
        self.resolve(path, query, 0)
    }

    fn navigate_with(
        &self,
        target: String,
        replace: bool,
        redirects: usize,
    ) -> LocalBoxFuture<'static, NavigationOutcome> {
        let mode = self.mode();
        {
            let mut location = self.inner.location.borrow_mut();
            match (mode, replace) {
                (RouterMode::Fragment, _) => location.set_fragment(&target),
                (RouterMode::History, false) => location.push(&target),
                (RouterMode::History, true) => location.replace(&target),
            }
        }

        let (path, query) = split_query(&target);
        let path = match mode {
            RouterMode::Fragment => fragment_path(&path),
            RouterMode::History => normalize_path(&path, &self.inner.app.config().base_path),
        };
        self.resolve(path, query, redirects)
    }

    fn resolve(
        &self,
        path: String,
        query: String,
        redirects: usize,
    ) -> LocalBoxFuture<'static, NavigationOutcome> {
        let router = self.clone();
        async move {
            let generation = router.begin();
            let app = router.inner.app.clone();
            tracing::debug!(path = %path, generation, "navigation started");

            let (route, params) = router.match_or_fallback(&path);
            let mut props = route.props.clone();
            props.extend(params);
            props.extend(parse_query(&query));
            let nav = NavigationContext {
                path: path.clone(),
                props,
                route: route.clone(),
            };

            let global = router.inner.global.borrow().clone();
            let chains = [
                (MiddlewareStage::Global, global),
                (MiddlewareStage::Route, route.middlewares.clone()),
            ];
            for (stage, chain) in chains {
                for middleware in chain {
                    let guard = middleware.run(&nav).await;
                    if router.is_stale(generation) {
                        return NavigationOutcome::Superseded;
                    }
                    match guard {
                        Guard::Continue => {}
                        Guard::Abort => {
                            let abort = RuntimeError::MiddlewareAbort {
                                path: path.clone(),
                                stage,
                            };
                            app.info(&abort.to_string());
                            return NavigationOutcome::Aborted { stage };
                        }
                        Guard::Redirect(to) => return router.redirect(&path, to, redirects).await,
                    }
                }
            }

            let component = route
                .component
                .clone()
                .unwrap_or_else(|| app.config().not_found_component.clone());
            if app.registry().needs_load(&component) {
                let options = router.inner.options.borrow().clone();
                let loading = options.loading_for(&app);
                if let Some(markup) = &loading {
                    // The loading markup takes the container from the current view
                    router.release_current();
                    show_markup(&mut *app.target().borrow_mut(), router.inner.container, markup);
                }

                let loaded = app.load_component(&component).await;
                if router.is_stale(generation) {
                    return NavigationOutcome::Superseded;
                }
                if let Err(err) = loaded {
                    app.report(err);
                    show_failed_load(&app, router.inner.container, &options, loading.is_some());
                    return NavigationOutcome::Failed;
                }
            }

            router.render(path, component, nav.props)
        }
        .boxed_local()
    }

    async fn redirect(&self, from: &str, to: String, redirects: usize) -> NavigationOutcome {
        if redirects >= self.inner.app.config().max_redirects {
            self.inner.app.report(RuntimeError::RedirectLimit {
                path: from.to_string(),
            });
            return NavigationOutcome::Failed;
        }
        tracing::debug!(from, to = %to, "redirect");
        let outcome = self.navigate_with(to.clone(), false, redirects + 1).await;
        NavigationOutcome::Redirected {
            to,
            outcome: Box::new(outcome),
        }
    }

    fn match_or_fallback(&self, path: &str) -> (Rc<RouteEntry>, Props) {
        let table = self.inner.table.borrow();
        if let Some(found) = table.lookup(path) {
            return found;
        }

        let config = self.inner.app.config();
        let not_found = RuntimeError::RouteNotFound {
            path: path.to_string(),
        };
        self.inner.app.info(&not_found.to_string());
        let route = table.get(&config.not_found_route).unwrap_or_else(|| {
            Rc::new(RouteEntry::sentinel(
                &config.not_found_route,
                &config.not_found_component,
            ))
        });
        (route, Props::new())
    }

    /// Tear down the current instance, then mount `component`.
    ///
    /// An unregistered component is reported and the current view stays.
    fn render(&self, path: String, component: String, props: Props) -> NavigationOutcome {
        if !self.inner.app.registry().contains(&component) {
            self.inner
                .app
                .report(RenderError::ComponentNotFound(component));
            return NavigationOutcome::Failed;
        }

        self.release_current();

        let options = self.inner.options.borrow().clone();
        let handle = mount(&self.inner.app, &component, props, self.inner.container, options);
        let Some(handle) = handle else {
            return NavigationOutcome::Failed;
        };

        *self.inner.current.borrow_mut() = Some(handle);
        *self.inner.current_path.borrow_mut() = Some(path.clone());
        tracing::debug!(path = %path, component = %component, "navigation rendered");
        NavigationOutcome::Rendered { path, component }
    }

    /// Unmount the current component.
    fn release_current(&self) {
        let previous = self.inner.current.borrow_mut().take();
        drop(previous);
        *self.inner.current_path.borrow_mut() = None;
    }

    fn begin(&self) -> u64 {
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        generation
    }

    fn is_stale(&self, generation: u64) -> bool {
        let stale = self.inner.generation.get() != generation;
        if stale {
            tracing::debug!(generation, latest = self.inner.generation.get(), "stale navigation dropped");
        }
        stale
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn mode(&self) -> RouterMode {
        self.inner.app.config().router_mode
    }

    /// Pattern and parameters of the first route matching `path`.
    pub fn match_route(&self, path: &str) -> Option<(String, Props)> {
        self.inner
            .table
            .borrow()
            .lookup(path)
            .map(|(entry, params)| (entry.pattern.clone(), params))
    }

    /// Registered patterns in match order.
    pub fn routes(&self) -> Vec<String> {
        self.inner.table.borrow().patterns()
    }

    /// Path of the last rendered navigation.
    pub fn current_path(&self) -> Option<String> {
        self.inner.current_path.borrow().clone()
    }

    /// Component currently mounted by the router.
    pub fn current_component(&self) -> Option<String> {
        self.with_current(|handle| handle.component().to_string())
    }

    pub fn with_current<R>(&self, f: impl FnOnce(&MountHandle) -> R) -> Option<R> {
        self.inner.current.borrow().as_ref().map(f)
    }

    /// Latest navigation generation.
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn location(&self) -> &SharedLocation {
        &self.inner.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ComponentDefinition;
    use crate::renderer::{MemoryTarget, SharedTarget};
    use crate::router::MemoryLocation;
    use futures::executor::block_on;

    fn setup() -> (Router, Rc<RefCell<MemoryTarget>>, NodeId) {
        let mut memory = MemoryTarget::new();
        let container = memory.create_container("main");
        let memory = Rc::new(RefCell::new(memory));
        let target: SharedTarget = memory.clone();
        let app = App::builder(target).build();
        for name in ["Home", "User", "NotFound"] {
            app.register(
                name,
                ComponentDefinition::new().render(move |scope| {
                    let id = scope.props.get("id").and_then(|v| v.as_str()).unwrap_or("-");
                    format!("<p>{name} {id}</p>")
                }),
            );
        }

        let location: SharedLocation = Rc::new(RefCell::new(MemoryLocation::new("/").unwrap()));
        let router = Router::new(&app, container, location);
        let routes: IndexMap<String, RouteConfig> = [
            ("/".to_string(), RouteConfig::new().component("Home")),
            ("/users/:id".to_string(), RouteConfig::new().component("User")),
        ]
        .into_iter()
        .collect();
        router.add_routes(&routes);
        (router, memory, container)
    }

    #[test]
    fn test_initial_render_from_location() {
        let (router, memory, container) = setup();
        let outcome = block_on(router.handle_location_change());

        assert_eq!(
            outcome,
            NavigationOutcome::Rendered {
                path: "/".into(),
                component: "Home".into()
            }
        );
        assert_eq!(memory.borrow().inner_markup(container), "<p>Home -</p>");
    }

    #[test]
    fn test_navigate_pushes_and_renders() {
        let (router, memory, container) = setup();
        block_on(router.navigate("/users/7?tab=posts", false));

        assert_eq!(router.current_path().as_deref(), Some("/users/7"));
        assert_eq!(router.current_component().as_deref(), Some("User"));
        assert_eq!(memory.borrow().inner_markup(container), "<p>User 7</p>");
        assert_eq!(router.location().borrow().path(), "/users/7");
        assert_eq!(router.location().borrow().search(), "tab=posts");
    }

    #[test]
    fn test_unmatched_path_renders_not_found() {
        let (router, memory, container) = setup();
        let outcome = block_on(router.navigate("/nowhere", false));

        assert_eq!(
            outcome,
            NavigationOutcome::Rendered {
                path: "/nowhere".into(),
                component: "NotFound".into()
            }
        );
        assert_eq!(memory.borrow().inner_markup(container), "<p>NotFound -</p>");
    }

    #[test]
    fn test_generation_increments() {
        let (router, _, _) = setup();
        block_on(router.navigate("/", false));
        block_on(router.navigate("/users/1", true));
        assert_eq!(router.generation(), 2);
    }

    #[test]
    fn test_outcome_last() {
        let outcome = NavigationOutcome::Redirected {
            to: "/a".into(),
            outcome: Box::new(NavigationOutcome::Redirected {
                to: "/b".into(),
                outcome: Box::new(NavigationOutcome::Failed),
            }),
        };
        assert_eq!(outcome.last(), &NavigationOutcome::Failed);
    }
}
