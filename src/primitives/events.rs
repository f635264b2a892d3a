//! Event binder - `data-on="event:handler"` markers to listeners.
//!
//! Handler names resolve against the component's methods first. A computed
//! value of that name is not callable and is reported. Otherwise the app's
//! registered global handlers are consulted. Unresolved names are reported
//! at info level and left unbound.
//!
//! Listeners are installed under a fixed slot, so binding again after every
//! patch replaces rather than stacks them.

use std::rc::Rc;

use crate::engine::{App, ComponentContext, Invocation, Method};
use crate::renderer::{find_with_attribute, RenderTarget, TargetEvent};
use crate::types::{NodeId, Props};

const SLOT: &str = "bind";

/// Bind every event marker under `container`. Returns how many were bound.
pub fn bind_events(
    target: &mut dyn RenderTarget,
    container: NodeId,
    app: &App,
    context: &ComponentContext,
    props: &Props,
) -> usize {
    let attribute = app.config().event_attribute.clone();
    let mut bound = 0;

    for node in find_with_attribute(target, container, &attribute) {
        let Some(marker) = target.attribute(node, &attribute) else {
            continue;
        };
        let Some((event, name)) = marker.split_once(':') else {
            app.info(&format!("Malformed event binding \"{marker}\""));
            continue;
        };
        let (event, name) = (event.trim(), name.trim());

        let Some(method) = resolve_handler(app, context, name) else {
            continue;
        };
        let state = context.state.downgrade();
        let props = props.clone();
        target.set_listener(
            node,
            event,
            SLOT,
            Rc::new(move |e: &TargetEvent| {
                if let Some(state) = state.upgrade() {
                    method(&Invocation {
                        event: Some(e),
                        state: &state,
                        props: &props,
                    });
                }
            }),
        );
        bound += 1;
    }

    tracing::trace!(%container, bound, "events bound");
    bound
}

fn resolve_handler(app: &App, context: &ComponentContext, name: &str) -> Option<Method> {
    if let Some(method) = context.methods.get(name) {
        return Some(method.clone());
    }
    if context.computed.contains_key(name) {
        app.info(&format!("Handler \"{name}\" is a computed value and cannot be called"));
        return None;
    }
    if let Some(handler) = app.handler(name) {
        return Some(handler);
    }
    app.info(&format!("Handler \"{name}\" not found"));
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::renderer::{dispatch_event, materialize, parse, MemoryTarget, SharedTarget};
    use crate::types::Value;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    struct Fixture {
        shared: SharedTarget,
        container: NodeId,
        app: App,
        sink: Rc<MemorySink>,
    }

    fn fixture(markup: &str) -> Fixture {
        let mut target = MemoryTarget::new();
        let container = target.create_container("div");
        let node = materialize(&mut target, &parse(markup).unwrap());
        target.append_child(container, node);

        let shared: SharedTarget = Rc::new(RefCell::new(target));
        let sink = Rc::new(MemorySink::new());
        let app = App::builder(shared.clone()).diagnostics(sink.clone()).build();
        Fixture {
            shared,
            container,
            app,
            sink,
        }
    }

    fn bind(f: &Fixture, context: &ComponentContext, props: &Props) -> usize {
        let mut target = f.shared.borrow_mut();
        bind_events(&mut *target, f.container, &f.app, context, props)
    }

    fn button(f: &Fixture) -> NodeId {
        find_with_attribute(&*f.shared.borrow(), f.container, "data-on")[0]
    }

    #[test]
    fn test_method_bound_and_invoked() {
        let f = fixture(r#"<div><button data-on="click:increment">+</button></div>"#);
        let state = f.app.create_state(json!({"count": 0}), None);
        let context = ComponentContext::new(state.clone()).method("increment", |call| {
            assert_eq!(call.event.map(|e| e.name.as_str()), Some("click"));
            let count = call.state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
            call.state.set_key("count", json!(count + 1));
            Value::Null
        });

        assert_eq!(bind(&f, &context, &Props::new()), 1);
        let node = button(&f);
        dispatch_event(&f.shared, node, "click", Value::Null);
        dispatch_event(&f.shared, node, "click", Value::Null);
        assert_eq!(state.get("count"), Some(json!(2)));
    }

    #[test]
    fn test_rebinding_replaces_listener() {
        let f = fixture(r#"<div><button data-on="click:hit">x</button></div>"#);
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let context = ComponentContext::new(f.app.create_state(json!({}), None)).method("hit", move |_| {
            h.set(h.get() + 1);
            Value::Null
        });

        bind(&f, &context, &Props::new());
        bind(&f, &context, &Props::new());
        assert_eq!(dispatch_event(&f.shared, button(&f), "click", Value::Null), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_global_handler_fallback() {
        let f = fixture(r#"<div><button data-on="click:track">x</button></div>"#);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        f.app.register_handler("track", move |call| {
            s.borrow_mut().push(call.props.get("id").cloned());
            Value::Null
        });
        let context = ComponentContext::new(f.app.create_state(json!({}), None));
        let props = crate::types::props_from(json!({"id": 9}));

        assert_eq!(bind(&f, &context, &props), 1);
        dispatch_event(&f.shared, button(&f), "click", Value::Null);
        assert_eq!(*seen.borrow(), vec![Some(json!(9))]);
    }

    #[test]
    fn test_unresolved_handlers_reported() {
        let f = fixture(
            r#"<div><button data-on="click:missing">a</button><a data-on="click:total">b</a><i data-on="oops">c</i></div>"#,
        );
        let state = f.app.create_state(json!({"n": 1}), None);
        let total = f.app.computed(&state, |s| s["n"].clone(), true);
        let context = ComponentContext::new(state).computed("total", total);

        assert_eq!(bind(&f, &context, &Props::new()), 0);
        let infos = f.sink.infos();
        assert_eq!(infos.len(), 3);
        assert!(infos[0].contains("\"missing\" not found"));
        assert!(infos[1].contains("computed"));
        assert!(infos[2].contains("Malformed"));
    }
}
