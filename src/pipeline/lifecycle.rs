//! Lifecycle dispatcher.
//!
//! `on_mount` fires exactly once, after the first successful patch of a
//! render instance. `on_update` fires after every later successful patch.
//! `on_unmount` fires on teardown of an instance that was mounted.
//!
//! Every dispatched event is also emitted on the app's event bus as
//! `component:mount`, `component:update` or `component:unmount` with a
//! `{"component": name}` payload, hook or not.

use serde_json::json;

use crate::engine::{App, ComponentContext, Hook, Lifecycles};

/// Lifecycle event of a render instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Mount,
    Update,
    Unmount,
}

impl LifecycleEvent {
    pub fn name(self) -> &'static str {
        match self {
            LifecycleEvent::Mount => "mount",
            LifecycleEvent::Update => "update",
            LifecycleEvent::Unmount => "unmount",
        }
    }

    /// The hook registered for this event, if any.
    pub fn hook(self, lifecycles: &Lifecycles) -> Option<&Hook> {
        match self {
            LifecycleEvent::Mount => lifecycles.on_mount.as_ref(),
            LifecycleEvent::Update => lifecycles.on_update.as_ref(),
            LifecycleEvent::Unmount => lifecycles.on_unmount.as_ref(),
        }
    }
}

/// Which event the next patch or teardown of an instance fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct LifecycleTracker {
    mounted: bool,
    unmounted: bool,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful patch.
    pub fn after_patch(&mut self) -> LifecycleEvent {
        if self.mounted {
            LifecycleEvent::Update
        } else {
            self.mounted = true;
            LifecycleEvent::Mount
        }
    }

    /// Record teardown. `None` if the instance never mounted or was already
    /// torn down.
    pub fn teardown(&mut self) -> Option<LifecycleEvent> {
        if !self.mounted || self.unmounted {
            return None;
        }
        self.unmounted = true;
        Some(LifecycleEvent::Unmount)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted && !self.unmounted
    }
}

/// Run the hook for `event`, if one is registered. Returns whether it ran.
pub fn dispatch(
    app: &App,
    component: &str,
    lifecycles: &Lifecycles,
    event: LifecycleEvent,
    context: &ComponentContext,
) -> bool {
    tracing::trace!(component, event = event.name(), "lifecycle");
    let ran = match event.hook(lifecycles) {
        Some(hook) => {
            hook(context);
            true
        }
        None => false,
    };
    app.events().emit(
        &format!("component:{}", event.name()),
        &json!({ "component": component }),
    );
    ran
}
