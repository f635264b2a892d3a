//! Event Bus - named application events with payloads.
//!
//! Handlers run synchronously, in registration order. Owned by the
//! [`App`](crate::engine::App) so independent apps never share handlers.
//!
//! # Example
//!
//! ```ignore
//! let cleanup = app.events().on("login", |user| {
//!     println!("welcome {user}");
//! });
//!
//! app.events().emit("login", &json!("ada"));
//! cleanup();
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::types::{Cleanup, Value};

/// Handler for a named event.
pub type EventHandler = Rc<dyn Fn(&Value)>;

struct HandlerRegistry {
    handlers: IndexMap<String, Vec<(usize, EventHandler)>>,
    next_id: usize,
}

impl HandlerRegistry {
    fn new() -> Self {
        Self {
            handlers: IndexMap::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Application event bus. Clones share the same handlers.
#[derive(Clone)]
pub struct EventBus {
    registry: Rc<RefCell<HandlerRegistry>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(HandlerRegistry::new())),
        }
    }

    /// Subscribe to an event. Returns cleanup function.
    pub fn on<F>(&self, event: &str, handler: F) -> Cleanup
    where
        F: Fn(&Value) + 'static,
    {
        let event = event.to_string();
        let id = {
            let mut reg = self.registry.borrow_mut();
            let id = reg.next_id();
            reg.handlers
                .entry(event.clone())
                .or_default()
                .push((id, Rc::new(handler)));
            id
        };

        let weak: Weak<RefCell<HandlerRegistry>> = Rc::downgrade(&self.registry);
        Box::new(move || {
            let Some(registry) = weak.upgrade() else { return };
            let mut reg = registry.borrow_mut();
            if let Some(handlers) = reg.handlers.get_mut(&event) {
                handlers.retain(|(handler_id, _)| *handler_id != id);
                if handlers.is_empty() {
                    reg.handlers.shift_remove(&event);
                }
            }
        })
    }

    /// Dispatch an event. Returns how many handlers ran.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        // Handlers may subscribe or emit themselves
        let handlers: Vec<EventHandler> = self
            .registry
            .borrow()
            .handlers
            .get(event)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Remove every handler of an event.
    pub fn off_all(&self, event: &str) {
        self.registry.borrow_mut().handlers.shift_remove(event);
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(event)
            .map_or(0, Vec::len)
    }
}
