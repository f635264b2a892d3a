//! Component Registry - name to definition mapping.
//!
//! Manages the components of one [`App`](super::App):
//! - Validation on registration (non-empty name, render function present)
//! - Replacement when a name is registered again
//! - Which lazy components have already been loaded

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;

use super::component::ComponentDefinition;
use crate::error::RegistrationError;

// =============================================================================
// Registry
// =============================================================================

/// Component registry. Never removes a component implicitly.
#[derive(Default)]
pub struct Registry {
    components: RefCell<IndexMap<String, Rc<ComponentDefinition>>>,
    loaded: RefCell<HashSet<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component, replacing any previous one under that name.
    pub fn register(
        &self,
        name: &str,
        definition: ComponentDefinition,
    ) -> Result<(), RegistrationError> {
        if name.trim().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if definition.render.is_none() {
            return Err(RegistrationError::MissingRender {
                name: name.to_string(),
            });
        }

        let replaced = self
            .components
            .borrow_mut()
            .insert(name.to_string(), Rc::new(definition))
            .is_some();
        // A replaced lazy component has to be loaded again
        self.loaded.borrow_mut().remove(name);
        tracing::debug!(component = name, replaced, "component registered");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Rc<ComponentDefinition>> {
        self.components.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.borrow().contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.components.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.components.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.borrow().is_empty()
    }

    // -------------------------------------------------------------------------
    // Lazy loading
    // -------------------------------------------------------------------------

    /// Whether `name` is lazy and its loader has not completed yet.
    pub fn needs_load(&self, name: &str) -> bool {
        let lazy = self
            .components
            .borrow()
            .get(name)
            .is_some_and(|def| def.is_lazy());
        lazy && !self.loaded.borrow().contains(name)
    }

    pub fn mark_loaded(&self, name: &str) {
        self.loaded.borrow_mut().insert(name.to_string());
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.borrow().contains(name)
    }
}
