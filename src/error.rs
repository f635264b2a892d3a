//! Error taxonomy for the runtime.
//!
//! Nothing here is fatal to the process. Every error degrades a single
//! registration, render pass, navigation, or storage call, and is reported
//! through the app's [`DiagnosticSink`](crate::diagnostics::DiagnosticSink).

use std::io;

use thiserror::Error;

/// Invalid component definition. The registration is skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Component name was empty
    #[error("Invalid component definition: name is required")]
    EmptyName,

    /// Definition had no render function
    #[error("Invalid component definition for '{name}': render function is required")]
    MissingRender { name: String },
}

/// Failure while producing markup, patching, or loading a component.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No component registered under this name
    #[error("Component \"{0}\" not found")]
    ComponentNotFound(String),

    /// The render function reported a failure
    #[error("Render error in \"{component}\": {message}")]
    Render { component: String, message: String },

    /// The lazy loader of a component failed
    #[error("Lazy load of \"{component}\" failed: {message}")]
    LazyLoad { component: String, message: String },
}

impl RenderError {
    /// Convenience constructor for render functions.
    pub fn render(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Storage provider read/write failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stored value could not be encoded or decoded
    #[error("Storage serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider cannot serve requests
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// A route pattern could not be compiled. The route is skipped.
#[derive(Debug, Error, Clone)]
pub enum RouteError {
    #[error("Invalid route pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Navigation stage at which a middleware stopped a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareStage {
    Global,
    Route,
}

impl std::fmt::Display for MiddlewareStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareStage::Global => f.write_str("global"),
            MiddlewareStage::Route => f.write_str("route"),
        }
    }
}

/// Any error reported through the diagnostic sink.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    /// No route matched; resolved to the not-found component
    #[error("No route matches \"{path}\"")]
    RouteNotFound { path: String },

    /// A middleware returned a falsy result
    #[error("Navigation to \"{path}\" stopped by {stage} middleware")]
    MiddlewareAbort { path: String, stage: MiddlewareStage },

    /// A redirect chain exceeded the configured limit
    #[error("Too many redirects while navigating to \"{path}\"")]
    RedirectLimit { path: String },
}
