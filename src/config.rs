//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//!
//! ```ignore
//! let config = RuntimeConfig::from_json(r#"{ "router_mode": "fragment" }"#)?;
//! let app = App::builder(target).config(config).build();
//! ```

use serde::Deserialize;

use crate::error::ConfigError;
use crate::router::RouterMode;
use crate::state::NotifyMode;

/// Settings shared by every subsystem of an [`App`](crate::engine::App).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Prefix of directive marker attributes (`data-z-show`, ...).
    pub directive_prefix: String,
    /// Event-binding marker attribute, valued `"event:handler"`.
    pub event_attribute: String,
    /// How state containers notify on multi-key writes.
    pub notify_mode: NotifyMode,
    /// How the router derives the logical path from the location.
    pub router_mode: RouterMode,
    /// Prefix stripped from history-mode paths.
    pub base_path: String,
    /// Component rendered when no route matches.
    pub not_found_component: String,
    /// Route consulted before falling back to the not-found component.
    pub not_found_route: String,
    /// Longest redirect chain a single navigation may follow.
    pub max_redirects: usize,
    /// Markup shown by a render loop whose render fails.
    pub fallback_markup: Option<String>,
    /// Markup shown while a lazy component loads.
    pub loading_markup: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            directive_prefix: "data-z-".to_string(),
            event_attribute: "data-on".to_string(),
            notify_mode: NotifyMode::PerKey,
            router_mode: RouterMode::History,
            base_path: String::new(),
            not_found_component: "NotFound".to_string(),
            not_found_route: "/404".to_string(),
            max_redirects: 16,
            fallback_markup: None,
            loading_markup: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from JSON, filling unspecified fields with defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}
