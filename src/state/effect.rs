//! Effects - side effects keyed on dependency values.
//!
//! An effect runs once when created, then again after any write to its state
//! that changes one of its dependency values. An effect with no dependencies
//! runs after every write.
//!
//! # Example
//!
//! ```ignore
//! let cleanup = use_effect(
//!     &cart,
//!     |s| vec![s.get("items").cloned().unwrap_or_default()],
//!     |s| println!("cart now {:?}", s.get("items")),
//! );
//!
//! cart.set_key("coupon", json!("X")); // items unchanged, effect skipped
//! cleanup();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use super::store::State;
use crate::types::{Cleanup, Props, Value};

/// Run `effect` now and whenever `deps` yields different values.
///
/// `deps` and `effect` both see the container value. Returns the function
/// that stops the effect.
pub fn use_effect<D, F>(state: &State, deps: D, effect: F) -> Cleanup
where
    D: Fn(&Props) -> Vec<Value> + 'static,
    F: Fn(&Props) + 'static,
{
    let snapshot = state.get_all();
    let previous = Rc::new(RefCell::new(deps(&snapshot)));
    effect(&snapshot);

    state.subscribe(move |change| {
        let current = deps(&change.snapshot);
        // Released before the effect runs, which may write again
        let changed = {
            let mut previous = previous.borrow_mut();
            let changed = current.is_empty() || *previous != current;
            *previous = current;
            changed
        };
        if changed {
            tracing::trace!(keys = ?change.keys, "effect re-run");
            effect(&change.snapshot);
        }
    })
}
