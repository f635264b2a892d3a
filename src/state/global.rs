//! Global Store - named mutations and async actions over one [`State`].
//!
//! Mutations are the synchronous way to change store state. Actions are
//! async, receive the store, and usually end by committing.
//!
//! # Example
//!
//! ```ignore
//! let store = app
//!     .create_store(json!({"user": null}))
//!     .mutation("login", |state, user| state.set_key("user", user.clone()))
//!     .action("fetch_user", |store, id| async move {
//!         let user = api::user(id).await;
//!         store.commit("login", user.clone());
//!         user
//!     });
//!
//! block_on(store.dispatch("fetch_user", json!(7)));
//! ```

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use indexmap::IndexMap;

use super::store::State;
use crate::types::Value;

/// Synchronous state change.
pub type MutationHandler = Rc<dyn Fn(&State, &Value)>;

/// Async operation against the store, resolving to a result value.
pub type ActionHandler = Rc<dyn Fn(Store, Value) -> LocalBoxFuture<'static, Value>>;

struct StoreInner {
    state: State,
    mutations: RefCell<IndexMap<String, MutationHandler>>,
    actions: RefCell<IndexMap<String, ActionHandler>>,
}

/// Shared store. Clones share state, mutations and actions.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    pub fn new(state: State) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state,
                mutations: RefCell::new(IndexMap::new()),
                actions: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Register a mutation (builder style). Replaces one of the same name.
    pub fn mutation<F>(self, name: impl Into<String>, mutation: F) -> Self
    where
        F: Fn(&State, &Value) + 'static,
    {
        self.inner
            .mutations
            .borrow_mut()
            .insert(name.into(), Rc::new(mutation));
        self
    }

    /// Register an action (builder style). Replaces one of the same name.
    pub fn action<F, Fut>(self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(Store, Value) -> Fut + 'static,
        Fut: Future<Output = Value> + 'static,
    {
        let handler: ActionHandler =
            Rc::new(move |store: Store, payload: Value| action(store, payload).boxed_local());
        self.inner.actions.borrow_mut().insert(name.into(), handler);
        self
    }

    pub fn state(&self) -> &State {
        &self.inner.state
    }

    /// Run mutation `name`. Returns false if there is no such mutation.
    pub fn commit(&self, name: &str, payload: Value) -> bool {
        let mutation = self.inner.mutations.borrow().get(name).cloned();
        let Some(mutation) = mutation else {
            tracing::debug!(mutation = name, "unknown mutation");
            return false;
        };
        mutation(&self.inner.state, &payload);
        true
    }

    /// Run action `name`. Resolves to `None` if there is no such action.
    pub fn dispatch(&self, name: &str, payload: Value) -> LocalBoxFuture<'static, Option<Value>> {
        let action = self.inner.actions.borrow().get(name).cloned();
        let store = self.clone();
        let name = name.to_string();
        async move {
            let Some(action) = action else {
                tracing::debug!(action = %name, "unknown action");
                return None;
            };
            Some(action(store, payload).await)
        }
        .boxed_local()
    }

    /// Mutation names in registration order.
    pub fn mutations(&self) -> Vec<String> {
        self.inner.mutations.borrow().keys().cloned().collect()
    }

    /// Action names in registration order.
    pub fn actions(&self) -> Vec<String> {
        self.inner.actions.borrow().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::props_from;
    use futures::channel::oneshot;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use serde_json::json;
    use std::cell::Cell;

    fn counter_store() -> Store {
        Store::new(State::new(props_from(json!({"count": 0}))))
            .mutation("add", |state, by| {
                let count = state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
                state.set_key("count", json!(count + by.as_i64().unwrap_or(1)));
            })
            .mutation("reset", |state, _| state.set_key("count", json!(0)))
    }

    #[test]
    fn test_commit() {
        let store = counter_store();
        assert!(store.commit("add", json!(2)));
        assert!(store.commit("add", Value::Null));
        assert_eq!(store.state().get("count"), Some(json!(3)));

        assert!(!store.commit("missing", Value::Null));
        assert_eq!(store.mutations(), vec!["add", "reset"]);
    }

    #[test]
    fn test_commit_notifies_subscribers() {
        let store = counter_store();
        let seen = Rc::new(Cell::new(0));
        let clone = seen.clone();
        let _cleanup = store.state().subscribe(move |_| clone.set(clone.get() + 1));

        store.commit("add", json!(1));
        store.commit("reset", Value::Null);
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_dispatch_commits_after_await() {
        let (tx, rx) = oneshot::channel::<i64>();
        let rx = Rc::new(RefCell::new(Some(rx)));
        let store = counter_store().action("load", move |store: Store, _payload: Value| {
            let rx = rx.borrow_mut().take();
            async move {
                let by = match rx {
                    Some(rx) => rx.await.unwrap_or(0),
                    None => 0,
                };
                store.commit("add", json!(by));
                json!(by)
            }
        });

        let mut pool = LocalPool::new();
        let result = Rc::new(RefCell::new(None));
        let out = result.clone();
        let pending = store.dispatch("load", Value::Null);
        pool.spawner()
            .spawn_local(async move {
                *out.borrow_mut() = pending.await;
            })
            .unwrap();

        pool.run_until_stalled();
        assert_eq!(store.state().get("count"), Some(json!(0)));

        tx.send(5).unwrap();
        pool.run_until_stalled();
        assert_eq!(store.state().get("count"), Some(json!(5)));
        assert_eq!(*result.borrow(), Some(json!(5)));
    }

    #[test]
    fn test_dispatch_unknown_action() {
        let store = counter_store();
        assert_eq!(block_on(store.dispatch("missing", Value::Null)), None);
        assert!(store.actions().is_empty());
    }
}
