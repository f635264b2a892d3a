//! State Container - mutable value holder with synchronous notification.
//!
//! A [`State`] holds a JSON object. Writes go through [`State::set`], which
//! merges top-level keys and notifies every current listener before it
//! returns.
//!
//! # Notification
//!
//! - [`NotifyMode::PerKey`] (default): one notification per changed key, in
//!   assignment order. `set({a: 1, b: 2})` on a fresh container notifies
//!   twice, `a` first.
//! - [`NotifyMode::Batched`]: one notification per `set` call carrying every
//!   changed key.
//!
//! # Persistence
//!
//! With a persist key, the whole snapshot is written to the storage provider
//! after each field write and before that field's listeners run. There is no
//! locking or merging: two containers sharing a persist key overwrite each
//! other's snapshots, and the last writer wins.
//!
//! # Reentrancy
//!
//! No borrow is held while listeners run, so listeners may read and write the
//! container. A listener removed during a notification round is skipped if it
//! has not run yet; a listener added during a round first runs in the next.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Deserialize;

use super::storage::StorageProvider;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{RuntimeError, StorageError};
use crate::types::{Cleanup, Props, Value};

// =============================================================================
// Types
// =============================================================================

/// How a multi-key write is announced to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// One notification per changed key.
    #[default]
    PerKey,
    /// One notification per write call.
    Batched,
}

/// Payload delivered to state listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    /// Keys announced by this notification (exactly one in per-key mode).
    pub keys: Vec<String>,
    /// Container value when the notification round started.
    pub snapshot: Props,
}

/// State listener.
pub type Listener = Rc<dyn Fn(&StateChange)>;

/// Construction options for a [`State`].
#[derive(Clone)]
pub struct StateOptions {
    pub mode: NotifyMode,
    pub persist: Option<(String, Rc<dyn StorageProvider>)>,
    pub diagnostics: Rc<dyn DiagnosticSink>,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            mode: NotifyMode::PerKey,
            persist: None,
            diagnostics: Rc::new(TracingSink),
        }
    }
}

struct Persistence {
    key: String,
    provider: Rc<dyn StorageProvider>,
}

struct StateInner {
    value: RefCell<Props>,
    listeners: RefCell<Vec<(usize, Listener)>>,
    next_id: Cell<usize>,
    mode: NotifyMode,
    persistence: Option<Persistence>,
    diagnostics: Rc<dyn DiagnosticSink>,
}

// =============================================================================
// State
// =============================================================================

/// Handle to a state container. Clones share the same container.
#[derive(Clone)]
pub struct State {
    inner: Rc<StateInner>,
}

/// Non-owning handle to a state container.
#[derive(Clone)]
pub struct WeakState {
    inner: Weak<StateInner>,
}

impl WeakState {
    pub fn upgrade(&self) -> Option<State> {
        self.inner.upgrade().map(|inner| State { inner })
    }
}

impl State {
    /// Create a container with default options.
    pub fn new(initial: Props) -> Self {
        Self::with_options(initial, StateOptions::default())
    }

    /// Create a container.
    ///
    /// With a persist key, a stored object under that key replaces `initial`.
    /// A failed load is reported and `initial` is used.
    pub fn with_options(initial: Props, options: StateOptions) -> Self {
        let StateOptions {
            mode,
            persist,
            diagnostics,
        } = options;

        let mut value = initial;
        let persistence = persist.map(|(key, provider)| {
            match provider.get(&key) {
                Ok(Some(Value::Object(stored))) => value = stored,
                Ok(_) => {}
                Err(err) => diagnostics.error(&RuntimeError::Storage(err)),
            }
            Persistence { key, provider }
        });

        Self {
            inner: Rc::new(StateInner {
                value: RefCell::new(value),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                mode,
                persistence,
                diagnostics,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakState {
        WeakState {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles point at the same container.
    pub fn ptr_eq(&self, other: &State) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn mode(&self) -> NotifyMode {
        self.inner.mode
    }

    pub fn persist_key(&self) -> Option<&str> {
        self.inner.persistence.as_ref().map(|p| p.key.as_str())
    }

    pub(crate) fn diagnostics(&self) -> Rc<dyn DiagnosticSink> {
        self.inner.diagnostics.clone()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Current value of one field.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.value.borrow().get(key).cloned()
    }

    /// Copy of the whole container value.
    pub fn get_all(&self) -> Props {
        self.inner.value.borrow().clone()
    }

    /// Borrow the container value without copying.
    ///
    /// Writing to this container from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&Props) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Merge `partial` into the container, notifying for changed keys.
    ///
    /// A key is changed when it is new or its value differs.
    pub fn set(&self, partial: Props) {
        self.write(partial, false);
    }

    /// Write a single field.
    pub fn set_key(&self, key: impl Into<String>, value: Value) {
        let mut partial = Props::new();
        partial.insert(key.into(), value);
        self.set(partial);
    }

    /// Merge `partial`, treating every key as changed even if equal.
    pub fn assign(&self, partial: Props) {
        self.write(partial, true);
    }

    fn write(&self, partial: Props, force: bool) {
        match self.inner.mode {
            NotifyMode::PerKey => {
                for (key, value) in partial {
                    if !self.apply(&key, value, force) {
                        continue;
                    }
                    self.persist_or_report();
                    self.notify(vec![key]);
                }
            }
            NotifyMode::Batched => {
                let mut changed = Vec::new();
                for (key, value) in partial {
                    if self.apply(&key, value, force) {
                        changed.push(key);
                    }
                }
                if changed.is_empty() {
                    return;
                }
                self.persist_or_report();
                self.notify(changed);
            }
        }
    }

    fn apply(&self, key: &str, value: Value, force: bool) -> bool {
        let mut map = self.inner.value.borrow_mut();
        if !force && map.get(key) == Some(&value) {
            return false;
        }
        map.insert(key.to_string(), value);
        true
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Write the current snapshot to the storage provider.
    ///
    /// A no-op for containers without a persist key.
    pub fn persist(&self) -> Result<(), StorageError> {
        let Some(persistence) = &self.inner.persistence else {
            return Ok(());
        };
        let snapshot = Value::Object(self.get_all());
        persistence.provider.put(&persistence.key, snapshot)
    }

    fn persist_or_report(&self) {
        if let Err(err) = self.persist() {
            self.inner.diagnostics.error(&RuntimeError::Storage(err));
        }
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Append a listener. Returns the function that removes it.
    pub fn subscribe<F>(&self, listener: F) -> Cleanup
    where
        F: Fn(&StateChange) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let weak = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .borrow_mut()
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn notify(&self, keys: Vec<String>) {
        let round: Vec<(usize, Listener)> = self.inner.listeners.borrow().clone();
        let change = StateChange {
            keys,
            snapshot: self.get_all(),
        };
        tracing::trace!(keys = ?change.keys, listeners = round.len(), "state notify");

        for (id, listener) in round {
            let live = self
                .inner
                .listeners
                .borrow()
                .iter()
                .any(|(listener_id, _)| *listener_id == id);
            if live {
                listener(&change);
            }
        }
    }
}

// =============================================================================
// Ref - single-value container
// =============================================================================

/// Key under which a [`Ref`] stores its value.
pub const REF_KEY: &str = "value";

/// Single-value state container.
#[derive(Clone)]
pub struct Ref {
    state: State,
}

impl Ref {
    pub fn new(initial: Value) -> Self {
        Self::from_state(State::new(Props::new()), initial)
    }

    pub(crate) fn from_state(state: State, initial: Value) -> Self {
        state.set_key(REF_KEY, initial);
        Self { state }
    }

    pub fn value(&self) -> Value {
        self.state.get(REF_KEY).unwrap_or(Value::Null)
    }

    pub fn set_value(&self, value: Value) {
        self.state.set_key(REF_KEY, value);
    }

    pub fn subscribe<F>(&self, listener: F) -> Cleanup
    where
        F: Fn(&StateChange) + 'static,
    {
        self.state.subscribe(listener)
    }

    /// Underlying container.
    pub fn state(&self) -> &State {
        &self.state
    }
}
