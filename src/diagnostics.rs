//! Diagnostic sink - the single channel for runtime messages.
//!
//! Every subsystem reports through the [`DiagnosticSink`] owned by the
//! [`App`](crate::engine::App). The default [`TracingSink`] forwards to
//! `tracing`; hosts may install their own sink to intercept or replace it.
//!
//! # Example
//!
//! ```ignore
//! use spark_ui::diagnostics::MemorySink;
//!
//! let sink = Rc::new(MemorySink::new());
//! let app = App::builder(target).diagnostics(sink.clone()).build();
//! // ...
//! assert!(sink.errors().is_empty());
//! ```

use std::cell::RefCell;

use crate::error::RuntimeError;

const TRACING_TARGET: &str = "spark_ui";

// =============================================================================
// Types
// =============================================================================

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Receiver for runtime diagnostics.
pub trait DiagnosticSink {
    /// Informational message (navigation stopped, handler not found, ...).
    fn info(&self, message: &str);

    /// Error that degraded one operation.
    fn error(&self, error: &RuntimeError);
}

// =============================================================================
// Tracing Sink
// =============================================================================

/// Default sink: forwards to `tracing` under the `spark_ui` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!(target: TRACING_TARGET, "{message}");
    }

    fn error(&self, error: &RuntimeError) {
        tracing::error!(target: TRACING_TARGET, error = %error, "runtime error");
    }
}

// =============================================================================
// Memory Sink
// =============================================================================

/// A recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

/// Sink that records every diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RefCell<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded diagnostics, oldest first.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    /// Messages of recorded errors.
    pub fn errors(&self) -> Vec<String> {
        self.messages(Level::Error)
    }

    /// Messages of recorded info diagnostics.
    pub fn infos(&self) -> Vec<String> {
        self.messages(Level::Info)
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    fn messages(&self, level: Level) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.level == level)
            .map(|d| d.message.clone())
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn info(&self, message: &str) {
        self.entries.borrow_mut().push(Diagnostic {
            level: Level::Info,
            message: message.to_string(),
        });
    }

    fn error(&self, error: &RuntimeError) {
        self.entries.borrow_mut().push(Diagnostic {
            level: Level::Error,
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;

    #[test]
    fn test_memory_sink_records_levels() {
        let sink = MemorySink::new();
        sink.info("navigation stopped");
        sink.error(&RenderError::ComponentNotFound("Missing".into()).into());

        assert_eq!(sink.entries().len(), 2);
        assert_eq!(sink.infos(), vec!["navigation stopped".to_string()]);
        assert_eq!(sink.errors(), vec!["Component \"Missing\" not found".to_string()]);

        sink.clear();
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        let sink = TracingSink;
        sink.info("hello");
        sink.error(&RenderError::ComponentNotFound("X".into()).into());
    }

    #[test]
    fn test_tracing_sink_under_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("spark_ui=info"))
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let sink = TracingSink;
            sink.info("navigation stopped");
            sink.error(&RenderError::render("Card", "boom").into());
        });
    }
}
