//! Route table - flattening, pattern compilation, first-match lookup.
//!
//! Nested declarations are flattened at registration, depth-first, parent
//! before children. A child's pattern is its parent's with the child's
//! appended, joined by exactly one `/`:
//!
//! ```text
//! "/users"          → /users
//!   "/:id"          → /users/:id
//!     "/posts"      → /users/:id/posts
//!   ""              → /users            (replaces the parent entry)
//! ```
//!
//! Lookup walks the table in registration order and returns the first
//! pattern that matches. A later, more specific pattern never wins over an
//! earlier general one.

use std::rc::Rc;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use super::middleware::Middleware;
use crate::error::RouteError;
use crate::types::{props_from, Props, Value};

// =============================================================================
// Route Config
// =============================================================================

/// One route declaration, possibly with nested children.
///
/// Deserializable from JSON; middlewares are attached in code.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Component rendered for this route. Unset falls back to the
    /// not-found component.
    pub component: Option<String>,
    /// Static props passed to the component
    pub props: Props,
    #[serde(skip)]
    pub middlewares: Vec<Middleware>,
    pub children: IndexMap<String, RouteConfig>,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(mut self, name: impl Into<String>) -> Self {
        self.component = Some(name.into());
        self
    }

    /// Static props. Non-object values are ignored.
    pub fn props(mut self, props: Value) -> Self {
        self.props = props_from(props);
        self
    }

    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn child(mut self, path: impl Into<String>, config: RouteConfig) -> Self {
        self.children.insert(path.into(), config);
        self
    }
}

/// Parse a path to route-config mapping from JSON.
pub fn routes_from_json(text: &str) -> Result<IndexMap<String, RouteConfig>, serde_json::Error> {
    serde_json::from_str(text)
}

// =============================================================================
// Route Entry
// =============================================================================

/// A flattened, compiled route.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: String,
    /// `None` routes render the not-found component
    pub component: Option<String>,
    pub props: Props,
    pub middlewares: Vec<Middleware>,
    /// `None` for sentinels, which match nothing
    regex: Option<Regex>,
    params: Vec<String>,
}

impl RouteEntry {
    /// Compile `pattern`. Children of `config` are ignored.
    pub fn compile(pattern: &str, config: &RouteConfig) -> Result<Self, RouteError> {
        let (source, params) = pattern_source(pattern);
        let regex = Regex::new(&source).map_err(|source| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            component: config.component.clone(),
            props: config.props.clone(),
            middlewares: config.middlewares.clone(),
            regex: Some(regex),
            params,
        })
    }

    /// Uncompiled entry rendering `component`, used when nothing matches.
    pub fn sentinel(pattern: &str, component: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            component: Some(component.to_string()),
            props: Props::new(),
            middlewares: Vec::new(),
            regex: None,
            params: Vec::new(),
        }
    }

    /// Parameter names in pattern order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Captured parameters if `path` matches.
    pub fn captures(&self, path: &str) -> Option<Props> {
        let caps = self.regex.as_ref()?.captures(path)?;
        Some(
            self.params
                .iter()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.clone(), Value::String(m.as_str().to_string())))
                })
                .collect(),
        )
    }
}

/// Regex source for a pattern: literal text escaped, `:name` captures one
/// run of non-`/` characters.
fn pattern_source(pattern: &str) -> (String, Vec<String>) {
    let mut source = String::from("^");
    let mut params = Vec::new();
    let mut rest = pattern;

    while let Some(colon) = rest.find(':') {
        source.push_str(&regex::escape(&rest[..colon]));
        let after = &rest[colon + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if len == 0 {
            source.push_str(&regex::escape(":"));
        } else {
            let name = &after[..len];
            source.push_str(&format!("(?P<{name}>[^/]+)"));
            params.push(name.to_string());
        }
        rest = &after[len..];
    }

    source.push_str(&regex::escape(rest));
    source.push('$');
    (source, params)
}

/// Join a parent pattern and a child segment with exactly one `/`.
pub fn join_paths(parent: &str, child: &str) -> String {
    if child.is_empty() {
        return parent.to_string();
    }
    if parent.is_empty() {
        return child.to_string();
    }
    format!(
        "{}/{}",
        parent.trim_end_matches('/'),
        child.trim_start_matches('/')
    )
}

/// Flatten nested declarations depth-first, parent before children.
pub fn flatten(routes: &IndexMap<String, RouteConfig>) -> Vec<(String, RouteConfig)> {
    fn walk(routes: &IndexMap<String, RouteConfig>, parent: &str, out: &mut Vec<(String, RouteConfig)>) {
        for (path, config) in routes {
            let full = join_paths(parent, path);
            out.push((full.clone(), config.clone()));
            walk(&config.children, &full, out);
        }
    }

    let mut out = Vec::new();
    walk(routes, "", &mut out);
    out
}

// =============================================================================
// Route Table
// =============================================================================

/// Flattened routes in registration order.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: IndexMap<String, Rc<RouteEntry>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten and compile `routes`.
    ///
    /// Re-registered patterns replace their entry in place. Patterns that
    /// fail to compile are skipped and returned.
    pub fn add(&mut self, routes: &IndexMap<String, RouteConfig>) -> Vec<RouteError> {
        let mut errors = Vec::new();
        for (pattern, config) in flatten(routes) {
            match RouteEntry::compile(&pattern, &config) {
                Ok(entry) => {
                    tracing::debug!(pattern = %pattern, component = ?entry.component, "route registered");
                    self.entries.insert(pattern, Rc::new(entry));
                }
                Err(err) => errors.push(err),
            }
        }
        errors
    }

    /// First entry, in registration order, whose pattern matches `path`.
    pub fn lookup(&self, path: &str) -> Option<(Rc<RouteEntry>, Props)> {
        self.entries
            .values()
            .find_map(|entry| entry.captures(path).map(|params| (entry.clone(), params)))
    }

    /// Entry registered under exactly `pattern`.
    pub fn get(&self, pattern: &str) -> Option<Rc<RouteEntry>> {
        self.entries.get(pattern).cloned()
    }

    pub fn patterns(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
