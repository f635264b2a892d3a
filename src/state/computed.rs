//! Computed values derived from a source container.
//!
//! A [`Computed`] is itself a [`State`] holding the result under the
//! `"value"` key. It is seeded with `f(source)` and recomputed on every
//! source notification.
//!
//! # Memoization
//!
//! With `memoize`, a result structurally equal to the cached one suppresses
//! propagation entirely: subscribers of the computed container do not run.
//! Without it, every source notification re-assigns the result and notifies.

use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

use super::store::{State, StateOptions};
use crate::types::{Cleanup, Props, Value};

/// Key under which a computed container stores its result.
pub const COMPUTED_KEY: &str = "value";

/// Derived, optionally memoized state container.
#[derive(Clone)]
pub struct Computed {
    state: State,
    release: Rc<RefCell<Option<Cleanup>>>,
}

impl Computed {
    /// Derive a container from `source` through `compute`.
    pub fn new<F>(source: &State, compute: F, memoize: bool) -> Self
    where
        F: Fn(&Props) -> Value + 'static,
    {
        let initial = source.with(|snapshot| compute(snapshot));
        let state = State::with_options(
            single(initial.clone()),
            StateOptions {
                mode: source.mode(),
                persist: None,
                diagnostics: source.diagnostics(),
            },
        );

        let cache = RefCell::new(initial);
        let derived = state.clone();
        let weak_source = source.downgrade();
        let release = source.subscribe(move |change| {
            let next = match weak_source.upgrade() {
                Some(source) => source.with(|snapshot| compute(snapshot)),
                None => compute(&change.snapshot),
            };

            if memoize {
                if *cache.borrow() == next {
                    tracing::trace!("computed unchanged, propagation suppressed");
                    return;
                }
                *cache.borrow_mut() = next.clone();
                derived.set(single(next));
            } else {
                *cache.borrow_mut() = next.clone();
                derived.assign(single(next));
            }
        });

        Self {
            state,
            release: Rc::new(RefCell::new(Some(release))),
        }
    }

    /// Current result.
    pub fn value(&self) -> Value {
        self.state.get(COMPUTED_KEY).unwrap_or(Value::Null)
    }

    /// Stop following the source. The last result is kept.
    pub fn dispose(&self) {
        if let Some(release) = self.release.borrow_mut().take() {
            release();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.release.borrow().is_none()
    }
}

impl Deref for Computed {
    type Target = State;

    fn deref(&self) -> &State {
        &self.state
    }
}

fn single(value: Value) -> Props {
    let mut map = Props::new();
    map.insert(COMPUTED_KEY.to_string(), value);
    map
}
