//! Directive applier - marker attributes bound to behaviors.
//!
//! Runs after every successful patch. For each registered directive, in
//! registration order, the patched subtree is scanned for elements carrying
//! `prefix + name` and the handler is invoked once per element.
//!
//! Built-ins:
//! - `show` - toggles the hidden flag
//! - `if` - removes the element from its parent when falsy
//! - `focus` - requests focus when truthy
//! - `for` - `"item in path"`, one clone of the element per array item
//! - `model` - two-way binding between the element value and a state key
//!
//! Directive values are dotted paths resolved against the render scope. A
//! value that does not resolve falls back to the truthiness of its literal
//! text, so `data-z-show="false"` hides.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::engine::expr::{self, substitute_binding};
use crate::renderer::{find_with_attribute, RenderTarget, TargetEvent};
use crate::state::State;
use crate::types::{display_value, is_truthy, NodeId, Props, Value};

// =============================================================================
// Types
// =============================================================================

/// What a directive handler sees for one element.
pub struct DirectiveContext<'a> {
    pub target: &'a mut dyn RenderTarget,
    pub node: NodeId,
    pub parent: Option<NodeId>,
    /// Attribute value, untrimmed
    pub raw: &'a str,
    pub state: &'a State,
    /// Resolution scopes, searched in order
    pub scope: &'a [&'a Props],
    /// Full marker attribute name (`data-z-for`)
    pub marker: &'a str,
}

impl DirectiveContext<'_> {
    /// The value resolved as a path, if it resolves.
    pub fn value(&self) -> Option<Value> {
        expr::resolve(self.raw, self.scope)
    }

    /// Truthiness of the resolved value, or of the literal text.
    pub fn truthy(&self) -> bool {
        match self.value() {
            Some(value) => is_truthy(&value),
            None => literal_truthy(self.raw),
        }
    }
}

fn literal_truthy(raw: &str) -> bool {
    !matches!(raw.trim(), "" | "false" | "0")
}

/// Whether a handler changed the structure of the live tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveOutcome {
    /// Attributes, flags or listeners only
    Applied,
    /// Nodes were inserted or removed
    Structural,
}

/// Directive handler.
pub type DirectiveHandler = Rc<dyn Fn(&mut DirectiveContext<'_>) -> DirectiveOutcome>;

// =============================================================================
// Registry
// =============================================================================

/// Directive name to handler, in registration order.
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    handlers: IndexMap<String, DirectiveHandler>,
}

impl DirectiveRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the five built-in directives.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("show", show);
        registry.register("if", remove_if_falsy);
        registry.register("focus", focus);
        registry.register("for", expand_list);
        registry.register("model", bind_model);
        registry
    }

    /// Register a directive, replacing one of the same name in place.
    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut DirectiveContext<'_>) -> DirectiveOutcome + 'static,
    {
        self.handlers.insert(name.to_string(), Rc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<DirectiveHandler> {
        self.handlers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// =============================================================================
// Applier
// =============================================================================

/// Apply every registered directive under `container`.
///
/// Returns true if any handler changed the structure of the live tree.
pub fn apply_directives(
    target: &mut dyn RenderTarget,
    container: NodeId,
    registry: &DirectiveRegistry,
    prefix: &str,
    state: &State,
    scope: &[&Props],
) -> bool {
    let mut structural = false;

    for (name, handler) in &registry.handlers {
        let marker = format!("{prefix}{name}");
        // Rescanned per directive so each sees what earlier ones left behind
        for node in find_with_attribute(target, container, &marker) {
            let Some(raw) = target.attribute(node, &marker) else {
                continue;
            };
            let parent = target.parent(node);
            let mut ctx = DirectiveContext {
                target: &mut *target,
                node,
                parent,
                raw: &raw,
                state,
                scope,
                marker: &marker,
            };
            if handler(&mut ctx) == DirectiveOutcome::Structural {
                structural = true;
            }
        }
    }

    if structural {
        tracing::debug!(%container, "directives changed tree structure");
    }
    structural
}

// =============================================================================
// Built-ins
// =============================================================================

fn show(ctx: &mut DirectiveContext<'_>) -> DirectiveOutcome {
    let visible = ctx.truthy();
    ctx.target.set_hidden(ctx.node, !visible);
    DirectiveOutcome::Applied
}

fn remove_if_falsy(ctx: &mut DirectiveContext<'_>) -> DirectiveOutcome {
    if ctx.truthy() {
        return DirectiveOutcome::Applied;
    }
    match ctx.parent {
        Some(parent) => {
            ctx.target.remove_child(parent, ctx.node);
            DirectiveOutcome::Structural
        }
        None => DirectiveOutcome::Applied,
    }
}

fn focus(ctx: &mut DirectiveContext<'_>) -> DirectiveOutcome {
    if ctx.truthy() {
        ctx.target.focus(ctx.node);
    }
    DirectiveOutcome::Applied
}

/// `item in path`: clones replace the template in place, siblings stay.
///
/// A path that does not resolve to an array expands to nothing.
fn expand_list(ctx: &mut DirectiveContext<'_>) -> DirectiveOutcome {
    let Some(parent) = ctx.parent else {
        return DirectiveOutcome::Applied;
    };
    let Some((binding, path)) = ctx.raw.split_once(" in ") else {
        tracing::debug!(value = ctx.raw, "malformed list directive");
        return DirectiveOutcome::Applied;
    };
    let binding = binding.trim();
    let items = match expr::resolve(path, ctx.scope) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    ctx.target.remove_attribute(ctx.node, ctx.marker);
    for item in &items {
        let Some(clone) = ctx.target.clone_node(ctx.node) else {
            continue;
        };
        substitute_subtree(ctx.target, clone, binding, item);
        ctx.target.insert_before(parent, clone, ctx.node);
    }
    ctx.target.remove_child(parent, ctx.node);
    DirectiveOutcome::Structural
}

fn substitute_subtree(target: &mut dyn RenderTarget, root: NodeId, binding: &str, item: &Value) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(text) = target.text(node) {
            let replaced = substitute_binding(&text, binding, item);
            if replaced != text {
                target.set_text(node, &replaced);
            }
            continue;
        }
        for (name, value) in target.attributes(node) {
            let replaced = substitute_binding(&value, binding, item);
            if replaced != value {
                target.set_attribute(node, &name, &replaced);
            }
        }
        stack.extend(target.children(node));
    }
}

/// Value from state (empty when unset), written back on `input`.
fn bind_model(ctx: &mut DirectiveContext<'_>) -> DirectiveOutcome {
    let key = ctx.raw.trim().to_string();
    let current = ctx.state.get(&key).map(|v| display_value(&v)).unwrap_or_default();
    ctx.target.set_value(ctx.node, &current);

    let state = ctx.state.downgrade();
    ctx.target.set_listener(
        ctx.node,
        "input",
        "model",
        Rc::new(move |event: &TargetEvent| {
            if let Some(state) = state.upgrade() {
                let value = event.value.clone().unwrap_or_default();
                state.set_key(key.clone(), Value::String(value));
            }
        }),
    );
    DirectiveOutcome::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{materialize, parse, MemoryTarget};
    use crate::types::props_from;
    use serde_json::json;

    const PREFIX: &str = "data-z-";

    fn mount(markup: &str) -> (MemoryTarget, NodeId) {
        let mut target = MemoryTarget::new();
        let container = target.create_container("div");
        let tree = parse(markup).unwrap();
        let node = materialize(&mut target, &tree);
        target.append_child(container, node);
        (target, container)
    }

    fn apply(target: &mut MemoryTarget, container: NodeId, state: &State, scope: &Props) -> bool {
        let registry = DirectiveRegistry::with_builtins();
        apply_directives(target, container, &registry, PREFIX, state, &[scope])
    }

    #[test]
    fn test_builtin_order() {
        let registry = DirectiveRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["show", "if", "focus", "for", "model"]);
    }

    #[test]
    fn test_show_toggles_hidden() {
        let (mut target, container) = mount(
            r#"<div><p data-z-show="visible">a</p><p data-z-show="false">b</p><p data-z-show="1">c</p></div>"#,
        );
        let state = State::new(Props::new());
        let scope = props_from(json!({"visible": false}));

        assert!(!apply(&mut target, container, &state, &scope));
        let ps: Vec<NodeId> = find_with_attribute(&target, container, "data-z-show");
        assert!(target.is_hidden(ps[0]), "resolved false");
        assert!(target.is_hidden(ps[1]), "literal false");
        assert!(!target.is_hidden(ps[2]), "literal truthy");
    }

    #[test]
    fn test_if_removes_when_falsy() {
        let (mut target, container) =
            mount(r#"<div><p data-z-if="user.admin">secret</p><p data-z-if="user.name">hi</p></div>"#);
        let state = State::new(Props::new());
        let scope = props_from(json!({"user": {"admin": false, "name": "Ada"}}));

        assert!(apply(&mut target, container, &state, &scope));
        assert_eq!(
            target.inner_markup(container),
            r#"<div><p data-z-if="user.name">hi</p></div>"#
        );
    }

    #[test]
    fn test_focus() {
        let (mut target, container) = mount(r#"<form><input data-z-focus="true"></form>"#);
        let state = State::new(Props::new());
        apply(&mut target, container, &state, &Props::new());

        let input = target.find_by_tag(container, "input").unwrap();
        assert_eq!(target.focused(), Some(input));
    }

    #[test]
    fn test_for_expands_in_place() {
        let (mut target, container) = mount(
            r#"<ul><li>first</li><li data-z-for="todo in todos" title="{{todo.id}}">{{ todo.title }}</li><li>last</li></ul>"#,
        );
        let state = State::new(Props::new());
        let scope = props_from(json!({"todos": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]}));

        assert!(apply(&mut target, container, &state, &scope));
        assert_eq!(
            target.inner_markup(container),
            r#"<ul><li>first</li><li title="1">a</li><li title="2">b</li><li>last</li></ul>"#
        );
    }

    #[test]
    fn test_for_unresolved_expands_to_nothing() {
        let (mut target, container) = mount(r#"<ul><li data-z-for="x in missing">{{x}}</li></ul>"#);
        let state = State::new(Props::new());
        assert!(apply(&mut target, container, &state, &Props::new()));
        assert_eq!(target.inner_markup(container), "<ul></ul>");
    }

    #[test]
    fn test_model_two_way() {
        let (target, container) = mount(r#"<form><input data-z-model="name"></form>"#);
        let state = State::new(props_from(json!({"name": "Ada"})));
        let shared: crate::renderer::SharedTarget = Rc::new(std::cell::RefCell::new(target));

        {
            let mut target = shared.borrow_mut();
            let registry = DirectiveRegistry::with_builtins();
            apply_directives(&mut *target, container, &registry, PREFIX, &state, &[]);
        }
        let input = find_with_attribute(&*shared.borrow(), container, "data-z-model")[0];
        assert_eq!(shared.borrow().value(input).as_deref(), Some("Ada"));

        crate::renderer::input_value(&shared, input, "Grace");
        assert_eq!(state.get("name"), Some(json!("Grace")));
    }

    #[test]
    fn test_custom_directive() {
        let (mut target, container) = mount(r#"<div><span data-z-upper="word"></span></div>"#);
        let state = State::new(Props::new());
        let scope = props_from(json!({"word": "hey"}));

        let mut registry = DirectiveRegistry::new();
        registry.register("upper", |ctx| {
            let text = ctx.value().map(|v| display_value(&v)).unwrap_or_default();
            let node = ctx.target.create_text(&text.to_uppercase());
            ctx.target.append_child(ctx.node, node);
            DirectiveOutcome::Structural
        });

        assert!(apply_directives(&mut target, container, &registry, PREFIX, &state, &[&scope]));
        assert!(target.inner_markup(container).contains(">HEY</span>"));
    }
}
