//! Navigation middleware.
//!
//! A middleware receives the [`NavigationContext`] and resolves to a
//! [`Guard`]: continue, abort the whole navigation, or redirect. Global
//! middlewares run before the matched route's own, each in registration
//! order; the first non-continue result ends the chain.
//!
//! Plain values convert into guards the way route guards are usually
//! written: a non-empty string redirects, anything else continues when
//! truthy and aborts when falsy.
//!
//! ```ignore
//! router.before_each(Middleware::sync(|nav| {
//!     if nav.path.starts_with("/admin") && !session.is_admin() {
//!         return Guard::redirect("/login");
//!     }
//!     Guard::Continue
//! }));
//!
//! // Async, e.g. waiting on a permission check
//! let check = Middleware::new(|nav| {
//!     let path = nav.path.clone();
//!     async move { Guard::from(permissions(&path).await) }.boxed_local()
//! });
//! ```

use std::fmt;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use super::table::RouteEntry;
use crate::types::{is_truthy, Props, Value};

/// What the router sees for the navigation being resolved.
#[derive(Debug, Clone)]
pub struct NavigationContext {
    /// Normalized path, without query
    pub path: String,
    /// Static props, path parameters and query, later entries winning
    pub props: Props,
    pub route: Rc<RouteEntry>,
}

/// Result of one middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Continue,
    Abort,
    /// Stop this chain and navigate to the path instead
    Redirect(String),
}

impl Guard {
    pub fn redirect(path: impl Into<String>) -> Self {
        Guard::Redirect(path.into())
    }
}

impl From<bool> for Guard {
    fn from(pass: bool) -> Self {
        if pass { Guard::Continue } else { Guard::Abort }
    }
}

impl From<String> for Guard {
    fn from(path: String) -> Self {
        if path.is_empty() {
            Guard::Abort
        } else {
            Guard::Redirect(path)
        }
    }
}

impl From<&str> for Guard {
    fn from(path: &str) -> Self {
        Guard::from(path.to_string())
    }
}

impl From<Value> for Guard {
    fn from(value: Value) -> Self {
        match value {
            Value::String(path) => Guard::from(path),
            other if is_truthy(&other) => Guard::Continue,
            _ => Guard::Abort,
        }
    }
}

type MiddlewareFn = dyn Fn(&NavigationContext) -> LocalBoxFuture<'static, Guard>;

/// Global or route-level navigation middleware.
#[derive(Clone)]
pub struct Middleware {
    run: Rc<MiddlewareFn>,
}

impl Middleware {
    /// Async middleware. The future must own whatever it needs from the
    /// context.
    pub fn new<F>(middleware: F) -> Self
    where
        F: Fn(&NavigationContext) -> LocalBoxFuture<'static, Guard> + 'static,
    {
        Self {
            run: Rc::new(middleware),
        }
    }

    /// Middleware that decides without suspending.
    pub fn sync<F, R>(middleware: F) -> Self
    where
        F: Fn(&NavigationContext) -> R + 'static,
        R: Into<Guard>,
    {
        Self::new(move |nav: &NavigationContext| future::ready(middleware(nav).into()).boxed_local())
    }

    pub fn run(&self, nav: &NavigationContext) -> LocalBoxFuture<'static, Guard> {
        (self.run)(nav)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::table::{RouteConfig, RouteEntry};
    use futures::executor::block_on;
    use serde_json::json;

    fn context(path: &str) -> NavigationContext {
        let route = RouteEntry::compile(path, &RouteConfig::new().component("Page")).unwrap();
        NavigationContext {
            path: path.to_string(),
            props: Props::new(),
            route: Rc::new(route),
        }
    }

    #[test]
    fn test_guard_from_values() {
        assert_eq!(Guard::from(json!(true)), Guard::Continue);
        assert_eq!(Guard::from(json!(1)), Guard::Continue);
        assert_eq!(Guard::from(json!({})), Guard::Continue);
        assert_eq!(Guard::from(json!(false)), Guard::Abort);
        assert_eq!(Guard::from(json!(null)), Guard::Abort);
        assert_eq!(Guard::from(json!(0)), Guard::Abort);
        assert_eq!(Guard::from(json!("")), Guard::Abort);
        assert_eq!(Guard::from(json!("/login")), Guard::redirect("/login"));
        assert_eq!(Guard::from(false), Guard::Abort);
        assert_eq!(Guard::from("/home"), Guard::redirect("/home"));
    }

    #[test]
    fn test_sync_middleware() {
        let mw = Middleware::sync(|nav: &NavigationContext| nav.path == "/open");
        assert_eq!(block_on(mw.run(&context("/open"))), Guard::Continue);
        assert_eq!(block_on(mw.run(&context("/closed"))), Guard::Abort);
    }

    #[test]
    fn test_async_middleware() {
        let mw = Middleware::new(|nav: &NavigationContext| {
            let path = nav.path.clone();
            async move {
                if path.starts_with("/admin") {
                    Guard::redirect("/login")
                } else {
                    Guard::Continue
                }
            }
            .boxed_local()
        });
        assert_eq!(block_on(mw.run(&context("/admin/users"))), Guard::redirect("/login"));
        assert_eq!(block_on(mw.run(&context("/"))), Guard::Continue);
    }
}
