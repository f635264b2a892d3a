//! State Module - Application state and persistence
//!
//! This module contains the state systems that drive re-rendering:
//!
//! - **Store** - [`State`] container with field-granular notification
//! - **Computed** - Derived, memoized containers
//! - **Effect** - Side effects re-run when their dependencies change
//! - **Global Store** - Named mutations and async actions over a [`State`]
//! - **Storage** - The single [`StorageProvider`] capability of an app
//! - **Events** - Named application events
//!
//! # Example
//!
//! ```ignore
//! let cart = app.create_state(json!({"items": []}), Some("cart"));
//! let total = app.computed(&cart, |s| json!(s["items"].as_array().map_or(0, |a| a.len())));
//!
//! let cleanup = total.subscribe(|change| println!("{:?}", change.snapshot));
//! cart.set_key("items", json!([1, 2]));
//! cleanup();
//! ```

mod computed;
mod effect;
mod events;
mod global;
mod storage;
mod store;

pub use computed::{Computed, COMPUTED_KEY};
pub use effect::use_effect;
pub use events::{EventBus, EventHandler};
pub use global::{ActionHandler, MutationHandler, Store};
pub use storage::{JsonFileStorage, MemoryStorage, StorageProvider};
pub use store::{Listener, NotifyMode, Ref, State, StateChange, StateOptions, WeakState, REF_KEY};
