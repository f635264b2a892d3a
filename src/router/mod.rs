//! Path router
//!
//! Maps the location to a component and mounts it into one container.
//!
//! # Navigation
//!
//! ```text
//! navigate(path) → Location → normalize → RouteTable::lookup → props
//!     → global middlewares → route middlewares → lazy load → mount
//! ```
//!
//! - Routes are matched in registration order; the first match wins
//! - Props are static props, then path parameters, then the query string,
//!   later entries winning
//! - A newer navigation supersedes one still waiting on a middleware or a
//!   lazy load
//!
//! ```ignore
//! let router = Router::new(&app, container, location);
//! router.add_routes(&routes_from_json(r#"{
//!     "/": { "component": "Home" },
//!     "/users": { "component": "Users", "children": { "/:id": { "component": "User" } } }
//! }"#)?);
//! router.before_each(Middleware::sync(|nav| nav.path != "/private"));
//! block_on(router.handle_location_change());
//! ```

mod core;
mod history;
mod middleware;
mod table;

pub use self::core::{NavigationOutcome, Router};
pub use history::{
    current_path, fragment_path, normalize_path, parse_query, split_query, Location,
    MemoryLocation, RouterMode, SharedLocation,
};
pub use middleware::{Guard, Middleware, NavigationContext};
pub use table::{flatten, join_paths, routes_from_json, RouteConfig, RouteEntry, RouteTable};
