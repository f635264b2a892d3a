//! Component source files.
//!
//! A component source holds up to three bracketed sections:
//!
//! ```text
//! <template> markup with {{ placeholders }} </template>
//! <script>   descriptor text, surfaced but never executed </script>
//! <style>    stylesheet </style>
//! ```
//!
//! Behavior is supplied separately as a typed [`ComponentSpec`].

use std::fs;
use std::io;
use std::path::Path;

use super::component::{ComponentDefinition, ComponentSpec};

/// Sections extracted from a component source. Each is trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentSource {
    pub template: Option<String>,
    pub script: Option<String>,
    pub style: Option<String>,
}

impl ComponentSource {
    /// Extract the first `<template>`, `<script>` and `<style>` sections.
    pub fn parse(content: &str) -> Self {
        Self {
            template: section(content, "template"),
            script: section(content, "script"),
            style: section(content, "style"),
        }
    }

    /// Read and parse a source file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Combine the template and style with typed behavior.
    pub fn into_definition(self, spec: ComponentSpec) -> ComponentDefinition {
        let definition =
            ComponentDefinition::from_template(self.template.unwrap_or_default(), spec);
        match self.style {
            Some(style) if !style.is_empty() => definition.style(style),
            _ => definition,
        }
    }
}

fn section(content: &str, name: &str) -> Option<String> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = content.find(&open)? + open.len();
    let end = content[start..].find(&close)? + start;
    Some(content[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"
<template>
  <button data-on="click:increment">Count: {{ count }}</button>
</template>
<script>
() => ({ data: () => ({ count: 0 }) })
</script>
<style>
button { padding: 5px 10px; }
</style>
"#;

    #[test]
    fn test_parse_all_sections() {
        let source = ComponentSource::parse(COUNTER);
        assert_eq!(
            source.template.as_deref(),
            Some(r#"<button data-on="click:increment">Count: {{ count }}</button>"#)
        );
        assert!(source.script.unwrap().starts_with("() =>"));
        assert_eq!(source.style.as_deref(), Some("button { padding: 5px 10px; }"));
    }

    #[test]
    fn test_missing_sections() {
        let source = ComponentSource::parse("<template><p>only</p></template>");
        assert_eq!(source.template.as_deref(), Some("<p>only</p>"));
        assert_eq!(source.script, None);
        assert_eq!(source.style, None);

        let unterminated = ComponentSource::parse("<style>p {}");
        assert_eq!(unterminated.style, None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.zjs");
        fs::write(&path, COUNTER).unwrap();

        let source = ComponentSource::load(&path).unwrap();
        assert!(source.template.is_some());
        assert!(ComponentSource::load(dir.path().join("missing.zjs")).is_err());
    }

    #[test]
    fn test_into_definition_keeps_style() {
        let definition = ComponentSource::parse(COUNTER).into_definition(ComponentSpec::default());
        assert!(definition.render.is_some());
        assert_eq!(definition.style.as_deref(), Some("button { padding: 5px 10px; }"));
    }
}
