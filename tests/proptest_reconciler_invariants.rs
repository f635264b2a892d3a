//! Property-based invariant tests for the positional reconciler.
//!
//! These hold for **any** pair of trees:
//!
//! 1. Rendering the same tree twice produces zero mutations.
//! 2. Patching old → new leaves the same live tree as materializing new.
//! 3. A reconciler rendering a sequence of trees tracks the latest one.
//! 4. Clearing leaves the container empty.

use proptest::prelude::*;
use spark_ui::renderer::{materialize, patch, MemoryTarget, Reconciler, VNode};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Trees over a small alphabet so that old and new often share structure.
///
/// Only `class` is ever set: attribute order after a patch may differ from
/// a fresh build, and markup comparison is order-sensitive.
fn vnode() -> impl Strategy<Value = VNode> {
    let leaf = prop_oneof![
        prop_oneof![Just("a"), Just("b"), Just("hello"), Just("")].prop_map(VNode::text),
        (prop_oneof![Just("span"), Just("p")], proptest::option::of(class()))
            .prop_map(|(tag, class)| with_class(VNode::element(tag, vec![]), class)),
    ];
    leaf.prop_recursive(4, 32, 5, |inner| {
        (
            prop_oneof![Just("div"), Just("ul"), Just("p")],
            proptest::option::of(class()),
            proptest::collection::vec(inner, 0..5),
        )
            .prop_map(|(tag, class, children)| with_class(VNode::element(tag, children), class))
    })
}

/// Root trees are always elements, as parsed markup is.
fn root() -> impl Strategy<Value = VNode> {
    (
        prop_oneof![Just("div"), Just("section")],
        proptest::collection::vec(vnode(), 0..5),
    )
        .prop_map(|(tag, children)| VNode::element(tag, children))
}

fn class() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("x"), Just("y"), Just("")]
}

fn with_class(node: VNode, class: Option<&str>) -> VNode {
    match class {
        Some(class) => node.attr("class", class),
        None => node,
    }
}

fn fresh(node: &VNode) -> String {
    let mut target = MemoryTarget::new();
    let container = target.create_container("main");
    patch(&mut target, container, Some(node), None);
    target.inner_markup(container)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn identical_render_produces_no_mutations(tree in root()) {
        let mut target = MemoryTarget::new();
        let container = target.create_container("main");
        let mut reconciler = Reconciler::new();

        reconciler.render(&mut target, container, tree.clone());
        target.clear_mutations();

        let changed = reconciler.render(&mut target, container, tree);
        prop_assert!(!changed);
        prop_assert!(target.mutations().is_empty(),
            "second render of an identical tree mutated: {:?}", target.mutations());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Patch result equals a fresh build
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn patch_matches_materialize(old in root(), new in root()) {
        let mut target = MemoryTarget::new();
        let container = target.create_container("main");
        patch(&mut target, container, Some(&old), None);
        patch(&mut target, container, Some(&new), Some(&old));

        prop_assert_eq!(target.inner_markup(container), fresh(&new));
    }

    #[test]
    fn materialize_is_detached(tree in root()) {
        let mut target = MemoryTarget::new();
        let container = target.create_container("main");
        let node = materialize(&mut target, &tree);

        prop_assert_eq!(target.inner_markup(container), "");
        prop_assert_eq!(target.to_markup(node), fresh(&tree));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Sequences
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reconciler_tracks_latest_tree(trees in proptest::collection::vec(root(), 1..6)) {
        let mut target = MemoryTarget::new();
        let container = target.create_container("main");
        let mut reconciler = Reconciler::new();

        for tree in &trees {
            reconciler.render(&mut target, container, tree.clone());
            prop_assert_eq!(target.inner_markup(container), fresh(tree));
            prop_assert_eq!(reconciler.previous(), Some(tree));
        }
    }

    #[test]
    fn invalidate_rebuilds_from_scratch(old in root(), new in root()) {
        let mut target = MemoryTarget::new();
        let container = target.create_container("main");
        let mut reconciler = Reconciler::new();

        reconciler.render(&mut target, container, old);
        reconciler.invalidate();
        prop_assert!(reconciler.render(&mut target, container, new.clone()));
        prop_assert_eq!(target.inner_markup(container), fresh(&new));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Clear
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clear_empties_container(tree in root()) {
        let mut target = MemoryTarget::new();
        let container = target.create_container("main");
        let mut reconciler = Reconciler::new();

        reconciler.render(&mut target, container, tree);
        reconciler.clear(&mut target, container);

        prop_assert_eq!(target.inner_markup(container), "");
        prop_assert!(!reconciler.has_previous());
    }
}
