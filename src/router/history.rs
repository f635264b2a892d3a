//! Location adapter and path normalization.
//!
//! The router never touches a host's address bar directly. It reads and
//! writes through [`Location`]; [`MemoryLocation`] is the in-process host
//! used by tests and headless embedders.
//!
//! Two modes derive the logical path:
//! - [`RouterMode::Fragment`] - hosts without navigable history; the path
//!   lives in the fragment (`index.html#/users/7`)
//! - [`RouterMode::History`] - the real path, with any `…/index.html` prefix
//!   and the configured base path stripped

use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;
use url::Url;

use crate::types::{Props, Value};

/// How the router derives the logical path from the location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterMode {
    #[default]
    History,
    Fragment,
}

/// Host address adapter.
pub trait Location {
    /// Path component, always starting with `/`
    fn path(&self) -> String;
    /// Query string without the leading `?`
    fn search(&self) -> String;
    /// Fragment without the leading `#`
    fn fragment(&self) -> String;

    fn set_fragment(&mut self, fragment: &str);
    /// Add a history entry
    fn push(&mut self, path: &str);
    /// Replace the current history entry
    fn replace(&mut self, path: &str);
}

/// Shared, dynamically typed location.
pub type SharedLocation = Rc<RefCell<dyn Location>>;

const ORIGIN: &str = "http://localhost/";

// =============================================================================
// Memory Location
// =============================================================================

/// In-process location with a history stack.
#[derive(Debug, Clone)]
pub struct MemoryLocation {
    current: Url,
    previous: Vec<Url>,
}

impl MemoryLocation {
    /// Start at `start`, a path such as `/users?page=2#top`.
    pub fn new(start: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            current: Url::parse(ORIGIN)?.join(start)?,
            previous: Vec::new(),
        })
    }

    /// Current address, as an absolute URL.
    pub fn href(&self) -> &str {
        self.current.as_str()
    }

    /// Number of history entries.
    pub fn len(&self) -> usize {
        self.previous.len() + 1
    }

    /// Go back one entry, as a host's back button would.
    ///
    /// Returns false at the first entry. Follow with
    /// [`Router::handle_location_change`](super::Router::handle_location_change).
    pub fn back(&mut self) -> bool {
        match self.previous.pop() {
            Some(previous) => {
                self.current = previous;
                true
            }
            None => false,
        }
    }

    fn resolve(&self, path: &str) -> Option<Url> {
        match self.current.join(path) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::debug!(path, error = %err, "unresolvable location ignored");
                None
            }
        }
    }
}

impl Location for MemoryLocation {
    fn path(&self) -> String {
        self.current.path().to_string()
    }

    fn search(&self) -> String {
        self.current.query().unwrap_or_default().to_string()
    }

    fn fragment(&self) -> String {
        self.current.fragment().unwrap_or_default().to_string()
    }

    fn set_fragment(&mut self, fragment: &str) {
        let mut next = self.current.clone();
        next.set_fragment(Some(fragment));
        self.previous.push(std::mem::replace(&mut self.current, next));
    }

    fn push(&mut self, path: &str) {
        if let Some(next) = self.resolve(path) {
            self.previous.push(std::mem::replace(&mut self.current, next));
        }
    }

    fn replace(&mut self, path: &str) {
        if let Some(next) = self.resolve(path) {
            self.current = next;
        }
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Logical path and query of `location` under `mode`.
pub fn current_path(mode: RouterMode, location: &dyn Location, base_path: &str) -> (String, String) {
    match mode {
        RouterMode::Fragment => split_query(&fragment_path(&location.fragment())),
        RouterMode::History => (
            normalize_path(&location.path(), base_path),
            location.search(),
        ),
    }
}

/// Fragment without `#`, or `/` when empty.
pub fn fragment_path(fragment: &str) -> String {
    let path = fragment.trim_start_matches('#');
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Strip any `…/index.html` prefix and `base_path`; ensure a leading `/`.
pub fn normalize_path(path: &str, base_path: &str) -> String {
    let path = match path.find("/index.html") {
        Some(at) => &path[at + "/index.html".len()..],
        None => path,
    };

    let base = base_path.trim_end_matches('/');
    let path = match path.strip_prefix(base) {
        Some(rest) if !base.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => path,
    };

    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Split `path?query` into its parts.
pub fn split_query(path: &str) -> (String, String) {
    match path.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (path.to_string(), String::new()),
    }
}

/// Decode a query string. Duplicate keys: the last occurrence wins.
pub fn parse_query(query: &str) -> Props {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fragment_path() {
        assert_eq!(fragment_path(""), "/");
        assert_eq!(fragment_path("#"), "/");
        assert_eq!(fragment_path("#/users/7"), "/users/7");
        assert_eq!(fragment_path("/about"), "/about");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/", ""), "/");
        assert_eq!(normalize_path("/users", ""), "/users");
        assert_eq!(normalize_path("/app/index.html", ""), "/");
        assert_eq!(normalize_path("/app/index.html/users", ""), "/users");
        assert_eq!(normalize_path("/shop/cart", "/shop"), "/cart");
        assert_eq!(normalize_path("/shop", "/shop/"), "/");
        assert_eq!(normalize_path("/shopping", "/shop"), "/shopping");
        assert_eq!(normalize_path("users", ""), "/users");
    }

    #[test]
    fn test_parse_query_last_wins() {
        let query = parse_query("?tab=posts&page=2&tab=likes&q=a+b%21");
        assert_eq!(query.get("tab"), Some(&json!("likes")));
        assert_eq!(query.get("page"), Some(&json!("2")));
        assert_eq!(query.get("q"), Some(&json!("a b!")));
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn test_memory_location_history() {
        let mut location = MemoryLocation::new("/start?x=1").unwrap();
        assert_eq!(location.path(), "/start");
        assert_eq!(location.search(), "x=1");

        location.push("/users/7?tab=posts");
        assert_eq!(location.path(), "/users/7");
        assert_eq!(location.search(), "tab=posts");
        assert_eq!(location.len(), 2);

        location.replace("/users/8");
        assert_eq!(location.len(), 2);
        assert_eq!(location.path(), "/users/8");
        assert_eq!(location.search(), "");

        assert!(location.back());
        assert_eq!(location.path(), "/start");
        assert!(!location.back());
    }

    #[test]
    fn test_current_path_by_mode() {
        let mut location = MemoryLocation::new("/index.html?ignored=1").unwrap();
        location.set_fragment("/cart?step=2");

        assert_eq!(
            current_path(RouterMode::Fragment, &location, ""),
            ("/cart".to_string(), "step=2".to_string())
        );
        assert_eq!(
            current_path(RouterMode::History, &location, ""),
            ("/".to_string(), "ignored=1".to_string())
        );
    }
}
